use std::num::NonZeroUsize;

/// The tunables of a `ParameterServer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// The amount of applied gradients between two target refreshes.
    pub update_every: NonZeroUsize,
    /// The capacity of the request mailbox, senders wait once it's full.
    pub mailbox: NonZeroUsize,
}

const UPDATE_EVERY: NonZeroUsize = NonZeroUsize::new(5).unwrap();
const MAILBOX: NonZeroUsize = NonZeroUsize::new(64).unwrap();

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            update_every: UPDATE_EVERY,
            mailbox: MAILBOX,
        }
    }
}
