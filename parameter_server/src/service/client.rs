use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::{Result, ServerErr, request::Request};
use crate::{
    parameters::{ParameterLayout, ParameterSet},
    storage::{Snapshot, SnapshotCell},
};

/// The handle workers use to talk to a running `ParameterServer`.
///
/// Reads go straight to the published snapshots and never queue behind gradient updates,
/// writes go through the server's mailbox. The server stops once every client is dropped.
#[derive(Debug, Clone)]
pub struct ServerClient {
    layout: Arc<ParameterLayout>,
    online: Arc<SnapshotCell>,
    target: Arc<SnapshotCell>,
    tx: mpsc::Sender<Request>,
}

impl ServerClient {
    pub(super) fn new(
        layout: Arc<ParameterLayout>,
        online: Arc<SnapshotCell>,
        target: Arc<SnapshotCell>,
        tx: mpsc::Sender<Request>,
    ) -> Self {
        Self {
            layout,
            online,
            target,
            tx,
        }
    }

    pub fn layout(&self) -> &Arc<ParameterLayout> {
        &self.layout
    }

    /// Returns the latest snapshot of the online parameters.
    pub fn get_parameters(&self) -> Arc<Snapshot> {
        self.online.load()
    }

    /// Returns the latest snapshot of the target parameters.
    pub fn get_target_parameters(&self) -> Arc<Snapshot> {
        self.target.load()
    }

    /// Sends a gradient to the server and waits until it's been applied.
    ///
    /// # Arguments
    /// * `worker_id` - The id of the worker that computed the gradient.
    /// * `version` - The store step the gradient was computed against.
    /// * `grads` - The gradient itself.
    ///
    /// # Returns
    /// The store step after applying the gradient, or a `ServerErr` if the server is gone or
    /// the gradient didn't match its layout.
    pub async fn record_gradient(
        &self,
        worker_id: usize,
        version: u64,
        grads: ParameterSet,
    ) -> Result<u64> {
        let (reply, rx) = oneshot::channel();

        let request = Request::RecordGradient {
            worker_id,
            version,
            grads,
            reply,
        };

        self.tx
            .send(request)
            .await
            .map_err(|_| ServerErr::Unavailable)?;

        rx.await.map_err(|_| ServerErr::Unavailable)?
    }
}
