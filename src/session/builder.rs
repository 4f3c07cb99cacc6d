use std::{path::PathBuf, sync::Arc};

use futures::future::join_all;
use log::{info, warn};
use machine_learning::{LinearActorCritic, LinearQ};
use parameter_server::{
    ParameterLayout, ParameterServer, ParameterStore, ServerConfig, Snapshot, StoreHandle,
    TensorSpec,
    initialization::{ConstParamGen, FanParamGen, FanScheme, ParamGen, RandParamGen},
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer},
};
use rand::{SeedableRng, rngs::StdRng};
use tokio::task::JoinHandle;
use worker::{
    DirectPublisher, Environment, EpisodeCoordinator, GradientPublisher, Model, ServerPublisher,
    Worker, WorkerConfig, WorkerMetrics,
};

use super::{TrainingReport, WorkerFailure};
use crate::{
    checkpoint,
    config::{FanSchemeConfig, InitConfig, ModelKind, OptimizerConfig, TrainingConfig, Variant},
    environment::Corridor,
    error::{Result, SessionErr},
};

type WorkerTask = (usize, JoinHandle<worker::Result<WorkerMetrics>>);

/// Builds and runs training sessions following a `TrainingConfig`.
///
/// The optimizer, the merge protocol and the model are resolved one after the other, each
/// step picks the concrete type and hands it down generically so nothing gets boxed on the
/// hot path.
pub struct SessionBuilder {
    config: TrainingConfig,
    resume: Option<PathBuf>,
}

impl SessionBuilder {
    /// Creates a new `SessionBuilder`.
    ///
    /// # Arguments
    /// * `config` - The configuration of the session.
    ///
    /// # Returns
    /// A new `SessionBuilder` instance.
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            resume: None,
        }
    }

    /// Starts from a checkpoint instead of freshly initialized parameters.
    pub fn resume(mut self, path: impl Into<PathBuf>) -> Self {
        self.resume = Some(path.into());
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains the configured reference model on the corridor environment.
    ///
    /// Must run inside a multi-threaded tokio runtime.
    ///
    /// # Returns
    /// The report of the finished session or a `SessionErr` if it couldn't start.
    pub async fn run(self) -> Result<TrainingReport> {
        let corridor = self.config.corridor;
        let env_factory = move |seed| Corridor::new(corridor, seed);
        let state_dim = env_factory(0).state_dim();

        match self.config.model() {
            ModelKind::ActorCritic => {
                let model = LinearActorCritic::new(state_dim, 2);
                self.run_with(env_factory, model).await
            }
            ModelKind::QNetwork => {
                let model = LinearQ::new(state_dim, 2);
                self.run_with(env_factory, model).await
            }
        }
    }

    /// Trains any model on any environment.
    ///
    /// # Arguments
    /// * `env_factory` - Builds a worker's environment given its seed.
    /// * `model` - The model, cloned into every worker.
    ///
    /// # Returns
    /// The report of the finished session or a `SessionErr` if it couldn't start.
    pub async fn run_with<E, M, F>(self, env_factory: F, model: M) -> Result<TrainingReport>
    where
        E: Environment + Send + 'static,
        M: Model + Clone + Send + 'static,
        F: Fn(u64) -> E,
    {
        self.config.validate()?;

        match self.config.optimizer() {
            OptimizerConfig::GradientDescent { lr } => {
                let factory = |_: &TensorSpec| GradientDescent::new(lr);
                self.resolve_variant(env_factory, model, factory).await
            }
            OptimizerConfig::Momentum { lr, momentum } => {
                let factory = |spec: &TensorSpec| {
                    GradientDescentWithMomentum::new(spec.numel(), lr, momentum)
                };
                self.resolve_variant(env_factory, model, factory).await
            }
            OptimizerConfig::Adam {
                lr,
                beta1,
                beta2,
                epsilon,
            } => {
                let factory =
                    |spec: &TensorSpec| Adam::new(spec.numel(), lr, beta1, beta2, epsilon);
                self.resolve_variant(env_factory, model, factory).await
            }
        }
    }

    /// Resolves the gradient merge protocol of the session.
    async fn resolve_variant<E, M, F, O, OF>(
        self,
        env_factory: F,
        model: M,
        optimizer_factory: OF,
    ) -> Result<TrainingReport>
    where
        E: Environment + Send + 'static,
        M: Model + Clone + Send + 'static,
        F: Fn(u64) -> E,
        O: Optimizer + Send + 'static,
        OF: FnMut(&TensorSpec) -> O,
    {
        let store = self.build_store(model.layout(), optimizer_factory)?;

        match self.config.variant {
            Variant::Direct => self.run_direct(store, env_factory, model).await,
            Variant::Server => self.run_server(store, env_factory, model).await,
        }
    }

    /// Workers apply their gradients straight into the shared store.
    async fn run_direct<E, M, F, O>(
        self,
        store: ParameterStore<O>,
        env_factory: F,
        model: M,
    ) -> Result<TrainingReport>
    where
        E: Environment + Send + 'static,
        M: Model + Clone + Send + 'static,
        F: Fn(u64) -> E,
        O: Optimizer + Send + 'static,
    {
        let handle = StoreHandle::new(store);
        let coordinator = self.coordinator();
        let publisher = DirectPublisher::new(handle.clone());

        let tasks = self.spawn_workers(publisher, &env_factory, &model, &coordinator)?;
        let (workers, failures) = join_workers(tasks).await;

        self.finish(handle.snapshot(), &coordinator, workers, failures, None)
    }

    /// Workers send their gradients to a parameter server task.
    async fn run_server<E, M, F, O>(
        self,
        store: ParameterStore<O>,
        env_factory: F,
        model: M,
    ) -> Result<TrainingReport>
    where
        E: Environment + Send + 'static,
        M: Model + Clone + Send + 'static,
        F: Fn(u64) -> E,
        O: Optimizer + Send + 'static,
    {
        let config = ServerConfig {
            update_every: self.config.update_every,
            mailbox: self.config.mailbox,
        };

        let (server, client) = ParameterServer::new(store, config);
        let server = tokio::spawn(server.run());
        let coordinator = self.coordinator();

        // The server stops once the last client, held by the workers, is dropped.
        let tasks = self.spawn_workers(ServerPublisher::new(client), &env_factory, &model, &coordinator)?;
        let (workers, failures) = join_workers(tasks).await;

        let report = server
            .await
            .map_err(|e| SessionErr::ServerCrashed(e.to_string()))?;

        info!(
            applied = report.applied,
            target_refreshes = report.target_refreshes;
            "parameter server stopped"
        );

        let refreshes = Some(report.target_refreshes);
        self.finish(report.store.snapshot(), &coordinator, workers, failures, refreshes)
    }

    /// Builds every worker and only then spawns them, a worker that can't be built aborts
    /// the session before any training happens.
    fn spawn_workers<E, M, F, P>(
        &self,
        publisher: P,
        env_factory: &F,
        model: &M,
        coordinator: &Arc<EpisodeCoordinator>,
    ) -> Result<Vec<WorkerTask>>
    where
        E: Environment + Send + 'static,
        M: Model + Clone + Send + 'static,
        F: Fn(u64) -> E,
        P: GradientPublisher + 'static,
    {
        let workers = (0..self.config.workers.get())
            .map(|worker_id| {
                let config = self.worker_config(worker_id);
                let env = env_factory(config.seed);

                Worker::new(
                    config,
                    env,
                    model.clone(),
                    publisher.clone(),
                    Arc::clone(coordinator),
                )
                .map_err(|source| SessionErr::Worker { worker_id, source })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(workers = workers.len(); "spawning {} workers", self.config.variant);

        let tasks = workers
            .into_iter()
            .map(|worker| (worker.id(), tokio::spawn(worker.run())))
            .collect();

        Ok(tasks)
    }

    fn worker_config(&self, worker_id: usize) -> WorkerConfig {
        WorkerConfig {
            episodes: self.config.episodes,
            max_steps: self.config.max_steps,
            gamma: self.config.gamma,
            schedule: self.config.exploration.schedule(),
            policy: self.config.exploration.policy(),
            seed: self.config.worker_seed(worker_id),
            // TD targets bootstrap from the next state, so cut off episodes still train.
            train_truncated: self.config.variant == Variant::Server,
            ..WorkerConfig::new(worker_id)
        }
    }

    fn coordinator(&self) -> Arc<EpisodeCoordinator> {
        Arc::new(EpisodeCoordinator::new(
            self.config.window,
            self.config.solved_threshold,
            self.config.max_episodes,
        ))
    }

    /// Creates the canonical store, from a checkpoint when resuming.
    fn build_store<O, OF>(
        &self,
        layout: Arc<ParameterLayout>,
        optimizer_factory: OF,
    ) -> Result<ParameterStore<O>>
    where
        O: Optimizer,
        OF: FnMut(&TensorSpec) -> O,
    {
        if let Some(path) = &self.resume {
            let checkpoint = checkpoint::load(path, layout)?;
            info!(
                "resuming from {} at step {}",
                path.display(),
                checkpoint.step
            );

            let store =
                ParameterStore::from_params(checkpoint.params, checkpoint.step, optimizer_factory);
            return Ok(store);
        }

        let param_gen = self.resolve_param_gen()?;
        Ok(ParameterStore::new(layout, param_gen, optimizer_factory)?)
    }

    /// Resolves the `ParamGen` for the initial parameters.
    ///
    /// # Returns
    /// The parameter generator or an `InitErr` if the distribution is invalid.
    fn resolve_param_gen(&self) -> Result<Box<dyn ParamGen>> {
        let rng = self.generate_rng();

        let param_gen: Box<dyn ParamGen> = match self.config.init {
            InitConfig::Const { value } => Box::new(ConstParamGen::new(value)),
            InitConfig::Uniform { low, high } => Box::new(RandParamGen::uniform(rng, low, high)?),
            InitConfig::Normal { mean, std_dev } => {
                Box::new(RandParamGen::normal(rng, mean, std_dev)?)
            }
            InitConfig::Fan { scheme } => {
                let scheme = match scheme {
                    FanSchemeConfig::XavierUniform => FanScheme::XavierUniform,
                    FanSchemeConfig::Xavier => FanScheme::Xavier,
                    FanSchemeConfig::Kaiming => FanScheme::Kaiming,
                    FanSchemeConfig::LecunUniform => FanScheme::LecunUniform,
                    FanSchemeConfig::Lecun => FanScheme::Lecun,
                };
                Box::new(FanParamGen::new(rng, scheme))
            }
        };

        Ok(param_gen)
    }

    /// Generates a random number generator given (or not) a seed.
    fn generate_rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Saves the checkpoint, if configured, and assembles the report.
    fn finish(
        &self,
        snapshot: Arc<Snapshot>,
        coordinator: &EpisodeCoordinator,
        workers: Vec<(usize, WorkerMetrics)>,
        failures: Vec<WorkerFailure>,
        target_refreshes: Option<u64>,
    ) -> Result<TrainingReport> {
        if let Some(path) = &self.config.checkpoint {
            checkpoint::save(path, &snapshot)?;
        }

        let report = TrainingReport {
            variant: self.config.variant,
            step: snapshot.version(),
            episodes: coordinator.episodes(),
            solved: coordinator.is_solved(),
            average: coordinator.average(),
            params: snapshot.params().clone(),
            workers,
            failures,
            target_refreshes,
        };

        report.log_summary();
        Ok(report)
    }
}

/// Waits for every worker, collecting the metrics of the ones that finished and the failures
/// of the rest.
async fn join_workers(tasks: Vec<WorkerTask>) -> (Vec<(usize, WorkerMetrics)>, Vec<WorkerFailure>) {
    let (ids, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
    let mut workers = Vec::with_capacity(ids.len());
    let mut failures = Vec::new();

    for (worker_id, res) in ids.into_iter().zip(join_all(handles).await) {
        let error = match res {
            Ok(Ok(metrics)) => {
                workers.push((worker_id, metrics));
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("worker task failed: {e}"),
        };

        warn!("worker {worker_id} crashed: {error}");
        failures.push(WorkerFailure { worker_id, error });
    }

    (workers, failures)
}
