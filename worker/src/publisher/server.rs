use std::sync::Arc;

use parameter_server::{ParameterLayout, ServerClient, Snapshot};

use super::GradientPublisher;
use crate::{GradientUpdate, Result};

/// Sends gradients to a `ParameterServer`, the worker never touches the store itself.
#[derive(Clone)]
pub struct ServerPublisher {
    client: ServerClient,
}

impl ServerPublisher {
    pub fn new(client: ServerClient) -> Self {
        Self { client }
    }
}

impl GradientPublisher for ServerPublisher {
    fn layout(&self) -> &Arc<ParameterLayout> {
        self.client.layout()
    }

    fn fetch(&self) -> Arc<Snapshot> {
        self.client.get_parameters()
    }

    fn fetch_target(&self) -> Option<Arc<Snapshot>> {
        Some(self.client.get_target_parameters())
    }

    async fn publish(&self, update: GradientUpdate) -> Result<u64> {
        let GradientUpdate {
            worker_id,
            version,
            grads,
        } = update;

        let step = self.client.record_gradient(worker_id, version, grads).await?;
        Ok(step)
    }
}
