use parameter_server::ParameterSet;

/// A gradient on its way to the store, along with who computed it and against which version.
#[derive(Debug, Clone)]
pub struct GradientUpdate {
    pub worker_id: usize,
    pub version: u64,
    pub grads: ParameterSet,
}

impl GradientUpdate {
    pub fn new(worker_id: usize, version: u64, grads: ParameterSet) -> Self {
        Self {
            worker_id,
            version,
            grads,
        }
    }
}
