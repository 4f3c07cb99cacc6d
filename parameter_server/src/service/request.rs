use tokio::sync::oneshot;

use super::Result;
use crate::parameters::ParameterSet;

/// A message in the server's mailbox.
#[derive(Debug)]
pub(super) enum Request {
    /// Apply `grads`, reply with the resulting store step.
    RecordGradient {
        worker_id: usize,
        version: u64,
        grads: ParameterSet,
        reply: oneshot::Sender<Result<u64>>,
    },
}
