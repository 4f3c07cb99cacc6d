use std::sync::Arc;

use log::{debug, trace};
use tokio::{sync::mpsc, task};

use super::{Result, ServerClient, ServerConfig, request::Request};
use crate::{
    optimization::Optimizer,
    parameters::ParameterSet,
    storage::{ParameterStore, Snapshot, SnapshotCell},
};

/// What the server hands back once every client has been dropped.
#[derive(Debug)]
pub struct ServerReport<O: Optimizer> {
    /// The canonical store, with its final parameters.
    pub store: ParameterStore<O>,
    /// The last target snapshot.
    pub target: Arc<Snapshot>,
    /// The amount of gradients applied by this server.
    pub applied: u64,
    /// The amount of times the target was refreshed.
    pub target_refreshes: u64,
}

/// The single owner of the canonical parameters and the lagged target copy.
///
/// Gradients are applied one at a time in mailbox order. Every `update_every` applied
/// gradients the target is replaced with the online snapshot just published, the target is
/// never touched otherwise.
pub struct ParameterServer<O: Optimizer> {
    store: ParameterStore<O>,
    target: Arc<SnapshotCell>,
    rx: mpsc::Receiver<Request>,
    config: ServerConfig,
    applied: u64,
    target_refreshes: u64,
}

impl<O: Optimizer + Send> ParameterServer<O> {
    /// Creates a new `ParameterServer`, the target starts as a copy of the store.
    ///
    /// # Arguments
    /// * `store` - The store this server takes ownership of.
    /// * `config` - The server tunables.
    ///
    /// # Returns
    /// The server, to be driven with `run`, and the first client handle.
    pub fn new(store: ParameterStore<O>, config: ServerConfig) -> (Self, ServerClient) {
        let (tx, rx) = mpsc::channel(config.mailbox.get());
        let target = Arc::new(SnapshotCell::new((*store.snapshot()).clone()));

        let client = ServerClient::new(
            Arc::clone(store.layout()),
            Arc::clone(store.cell()),
            Arc::clone(&target),
            tx,
        );

        let server = Self {
            store,
            target,
            rx,
            config,
            applied: 0,
            target_refreshes: 0,
        };

        (server, client)
    }

    /// Serves requests until every `ServerClient` has been dropped.
    ///
    /// Must run inside a multi-threaded tokio runtime.
    ///
    /// # Returns
    /// The final state of the server.
    pub async fn run(mut self) -> ServerReport<O> {
        while let Some(request) = self.rx.recv().await {
            match request {
                Request::RecordGradient {
                    worker_id,
                    version,
                    grads,
                    reply,
                } => {
                    let res = self.record_gradient(worker_id, version, &grads);
                    // The worker may have given up waiting, the update stays applied.
                    let _ = reply.send(res);
                }
            }
        }

        ServerReport {
            target: self.target.load(),
            store: self.store,
            applied: self.applied,
            target_refreshes: self.target_refreshes,
        }
    }

    /// Applies a gradient and refreshes the target when it's due.
    ///
    /// # Returns
    /// The new store step, or a shape error leaving both parameter sets untouched.
    fn record_gradient(
        &mut self,
        worker_id: usize,
        version: u64,
        grads: &ParameterSet,
    ) -> Result<u64> {
        let snapshot = task::block_in_place(|| self.store.apply_gradient(grads))?;
        let step = snapshot.version();
        self.applied += 1;

        let staleness = (step - 1).saturating_sub(version);
        trace!(worker_id = worker_id, staleness = staleness; "recorded gradient");

        if self.applied % self.config.update_every.get() as u64 == 0 {
            self.target.publish(snapshot);
            self.target_refreshes += 1;
            debug!(step = step, refreshes = self.target_refreshes; "refreshed target parameters");
        }

        Ok(step)
    }
}
