use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::storage::ShapeMismatchErr;

/// The specific result type for parameter server requests.
pub type Result<T> = std::result::Result<T, ServerErr>;

/// Errors a `ServerClient` can get back from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErr {
    /// The server task has stopped, the request was never applied.
    Unavailable,
    /// The gradient didn't match the server's layout and was discarded.
    ShapeMismatch(ShapeMismatchErr),
}

impl From<ShapeMismatchErr> for ServerErr {
    fn from(value: ShapeMismatchErr) -> Self {
        Self::ShapeMismatch(value)
    }
}

impl Display for ServerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("parameter server is no longer running"),
            Self::ShapeMismatch(e) => write!(f, "gradient rejected: {e}"),
        }
    }
}

impl Error for ServerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable => None,
            Self::ShapeMismatch(e) => Some(e),
        }
    }
}
