use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::{NormalError, uniform::Error as UniformError};

/// The specific result type for the random parameter generators.
pub type Result<T> = std::result::Result<T, InitErr>;

/// Error returned when a random parameter generator is configured with values its
/// distribution can't accept, like an inverted range or a non finite deviation.
#[derive(Debug)]
pub struct InitErr(String);

impl From<NormalError> for InitErr {
    fn from(value: NormalError) -> Self {
        Self(format!("invalid normal distribution: {value}"))
    }
}

impl From<UniformError> for InitErr {
    fn from(value: UniformError) -> Self {
        Self(format!("invalid uniform distribution: {value}"))
    }
}

impl Display for InitErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for InitErr {}
