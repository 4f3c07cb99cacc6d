use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use parameter_server::Snapshot;
use rand::{SeedableRng, rngs::StdRng};
use tokio::task;

use crate::{
    Environment, EpisodeCoordinator, GradientPublisher, GradientUpdate, Model, ModelReplica,
    Result, Trajectory, Transition, WorkerConfig, WorkerMetrics,
};

/// Drives one rollout/train loop against the shared parameters.
///
/// Every episode goes through `sync -> rollout -> compute gradient -> publish`, then the score
/// is recorded in the shared `EpisodeCoordinator`. Episodes cut off at `max_steps` without
/// reaching a terminal state skip the gradient unless `train_truncated` is set, their score is
/// still recorded. The worker stops on its own once the
/// coordinator says so or its episode budget runs out.
pub struct Worker<E, M, P> {
    config: WorkerConfig,
    env: E,
    model: M,
    publisher: P,
    coordinator: Arc<EpisodeCoordinator>,
    replica: ModelReplica,
    rng: StdRng,
    metrics: WorkerMetrics,
}

impl<E, M, P> Worker<E, M, P>
where
    E: Environment + Send,
    M: Model + Send,
    P: GradientPublisher,
{
    /// Creates a new `Worker`.
    ///
    /// # Args
    /// * `config` - The worker's execution bounds.
    /// * `env` - The worker's own environment.
    /// * `model` - The model to train.
    /// * `publisher` - The protocol to read and update the shared parameters.
    /// * `coordinator` - The episode bookkeeping shared by every worker.
    ///
    /// # Returns
    /// The worker, or a `WorkerErr::ShapeMismatch` if the model's layout differs from the
    /// shared parameters' layout.
    pub fn new(
        config: WorkerConfig,
        env: E,
        model: M,
        publisher: P,
        coordinator: Arc<EpisodeCoordinator>,
    ) -> Result<Self> {
        publisher.layout().check(&model.layout())?;

        let replica = ModelReplica::new(Arc::clone(publisher.layout()));
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            env,
            model,
            publisher,
            coordinator,
            replica,
            rng,
            metrics: WorkerMetrics::default(),
        })
    }

    pub fn id(&self) -> usize {
        self.config.worker_id
    }

    /// Runs episodes until the coordinator signals a stop or the episode budget is spent.
    ///
    /// # Returns
    /// The worker's metrics, or the error that made it stop early.
    pub async fn run(mut self) -> Result<WorkerMetrics> {
        let worker_id = self.config.worker_id;
        info!(worker_id = worker_id; "worker started");

        for _ in 0..self.config.episodes.get() {
            if self.coordinator.should_stop() {
                break;
            }

            let target = self.sync()?;

            let start = Instant::now();
            let trajectory = task::block_in_place(|| self.rollout())?;
            self.metrics.rollout_time += start.elapsed();

            if trajectory.is_terminal() || self.config.train_truncated {
                self.train(&trajectory, target.as_deref()).await?;
            } else {
                debug!(
                    worker_id = worker_id,
                    steps = trajectory.len();
                    "episode truncated, skipping publish"
                );
                self.metrics.bump_truncated();
            }

            let score = trajectory.score();
            self.metrics.bump_episode(trajectory.len(), score);
            self.config.schedule.advance();

            if self.report(score) {
                break;
            }
        }

        info!(
            worker_id = worker_id,
            episodes = self.metrics.episodes,
            published = self.metrics.published,
            skipped = self.metrics.skipped,
            truncated = self.metrics.truncated;
            "worker finished"
        );

        Ok(self.metrics)
    }

    /// Overwrites the replica with the latest online snapshot.
    ///
    /// # Returns
    /// The target snapshot to train against, if the publisher keeps one.
    fn sync(&mut self) -> Result<Option<Arc<Snapshot>>> {
        let start = Instant::now();

        let snapshot = self.publisher.fetch();
        self.replica.sync(&snapshot)?;
        let target = self.publisher.fetch_target();

        self.metrics.sync_time += start.elapsed();
        Ok(target)
    }

    /// Plays a single episode with the replica's parameters.
    fn rollout(&mut self) -> Result<Trajectory> {
        let epsilon = self.config.schedule.epsilon();
        let mut trajectory = Trajectory::new();
        let mut state = self.env.reset();

        for _ in 0..self.config.max_steps.get() {
            let scores = self.model.forward(self.replica.params(), &state)?;
            let action = self.config.policy.select(&scores, epsilon, &mut self.rng);
            let step = self.env.step(action);

            trajectory.push(Transition {
                state,
                action,
                reward: step.reward,
                next_state: step.state.clone(),
                done: step.done,
            });

            state = step.state;
            if step.done {
                break;
            }
        }

        Ok(trajectory)
    }

    /// Computes the gradient of the trajectory and publishes it.
    ///
    /// A non finite loss or gradient skips the publish, the worker carries on.
    async fn train(&mut self, trajectory: &Trajectory, target: Option<&Snapshot>) -> Result<()> {
        let worker_id = self.config.worker_id;
        let gamma = self.config.gamma;

        let backward = timed(&mut self.metrics.compute_time, || {
            task::block_in_place(|| {
                let target = target.map(Snapshot::params);
                self.model
                    .backward(trajectory, self.replica.params(), target, gamma)
            })
        })?;

        if !backward.is_finite() {
            warn!(
                worker_id = worker_id,
                loss = backward.loss;
                "non finite backward pass, skipping publish"
            );
            self.metrics.bump_skipped();
            return Ok(());
        }

        let version = self.replica.version();
        let update = GradientUpdate::new(worker_id, version, backward.grads);

        let start = Instant::now();
        let step = self.publisher.publish(update).await?;
        self.metrics.publish_time += start.elapsed();

        // The store step right before this update minus the step the replica was synced at.
        let staleness = self.replica.staleness(step.saturating_sub(1));
        self.metrics.record_publish(staleness);
        debug!(worker_id = worker_id, step = step, staleness = staleness; "published gradient");

        Ok(())
    }

    /// Records the episode score and logs progress.
    ///
    /// # Returns
    /// Whether the worker should stop.
    fn report(&self, score: f32) -> bool {
        let worker_id = self.config.worker_id;
        let record = self.coordinator.record(score);
        let own = self.metrics.episodes;

        if worker_id == 0 {
            debug!(
                "episode {}\taverage score: {:.2}\tscore: {:.2}",
                record.episode, record.average, score
            );
        }

        if own % self.config.report_every.get() as u64 == 0 {
            info!(
                "worker {worker_id} episode {}\taverage score: {:.2}",
                record.episode, record.average
            );
        }

        if record.newly_solved {
            info!(
                "solved in {} episodes\taverage score: {:.2}",
                record.episode, record.average
            );
        }

        record.stop
    }
}

/// Runs `f`, adding the time it took to `acc`.
fn timed<T>(acc: &mut Duration, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    *acc += start.elapsed();
    out
}
