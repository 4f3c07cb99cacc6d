use std::{num::NonZeroUsize, sync::Arc};

use futures::future::join_all;
use parameter_server::{
    ParameterLayout, ParameterServer, ParameterSet, ParameterStore, ServerConfig, StoreHandle,
    initialization::ConstParamGen, optimization::GradientDescent, storage::Result,
};
use worker::{
    Backward, DirectPublisher, Environment, EpisodeCoordinator, GradientPublisher, Model,
    ServerPublisher, Step, Trajectory, Worker, WorkerConfig, WorkerErr, WorkerMetrics,
};

/// Ends every episode after `len` steps with a reward of one per step.
struct ScriptedEnv {
    len: usize,
    t: usize,
}

impl Environment for ScriptedEnv {
    fn reset(&mut self) -> Vec<f32> {
        self.t = 0;
        vec![0.]
    }

    fn step(&mut self, _action: usize) -> Step {
        self.t += 1;
        Step {
            state: vec![self.t as f32],
            reward: 1.,
            done: self.t >= self.len,
        }
    }

    fn num_actions(&self) -> usize {
        2
    }
}

/// Always returns a unit gradient, or a NaN one when `poisoned`.
struct UnitModel {
    layout: Arc<ParameterLayout>,
    poisoned: bool,
}

impl Model for UnitModel {
    fn layout(&self) -> Arc<ParameterLayout> {
        Arc::clone(&self.layout)
    }

    fn forward(&self, _params: &ParameterSet, _state: &[f32]) -> Result<Vec<f32>> {
        Ok(vec![0., 1.])
    }

    fn backward(
        &self,
        _trajectory: &Trajectory,
        params: &ParameterSet,
        _target: Option<&ParameterSet>,
        _gamma: f32,
    ) -> Result<Backward> {
        let mut grads = ParameterSet::zeros(Arc::clone(params.layout()));
        grads.fill(1.);

        let loss = if self.poisoned { f32::NAN } else { 0. };
        Ok(Backward { loss, grads })
    }
}

fn layout() -> Arc<ParameterLayout> {
    Arc::new(ParameterLayout::default().with("w", [2, 1]).with("b", [2]))
}

fn store() -> ParameterStore<GradientDescent> {
    ParameterStore::new(layout(), ConstParamGen::new(0.), |_| GradientDescent::new(0.1)).unwrap()
}

fn coordinator(window: usize, threshold: f32) -> Arc<EpisodeCoordinator> {
    Arc::new(EpisodeCoordinator::new(
        NonZeroUsize::new(window).unwrap(),
        threshold,
        None,
    ))
}

fn config(worker_id: usize, episodes: usize) -> WorkerConfig {
    let mut config = WorkerConfig::new(worker_id);
    config.episodes = NonZeroUsize::new(episodes).unwrap();
    config.max_steps = NonZeroUsize::new(10).unwrap();
    config
}

async fn run_workers<P>(
    publisher: P,
    coordinator: &Arc<EpisodeCoordinator>,
    workers: usize,
    episodes: usize,
) -> Vec<WorkerMetrics>
where
    P: GradientPublisher + 'static,
{
    let handles = (0..workers).map(|worker_id| {
        let env = ScriptedEnv { len: 3, t: 0 };
        let model = UnitModel {
            layout: layout(),
            poisoned: false,
        };

        let worker = Worker::new(
            config(worker_id, episodes),
            env,
            model,
            publisher.clone(),
            Arc::clone(coordinator),
        )
        .unwrap();

        tokio::spawn(worker.run())
    });

    join_all(handles)
        .await
        .into_iter()
        .map(|res| res.unwrap().unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn direct_workers_apply_every_gradient() {
    let _ = env_logger::builder().is_test(true).try_init();

    let handle = StoreHandle::new(store());
    let coordinator = coordinator(100, f32::INFINITY);
    let publisher = DirectPublisher::new(handle.clone());

    let metrics = run_workers(publisher, &coordinator, 3, 5).await;

    assert_eq!(handle.step(), 15);
    assert_eq!(coordinator.episodes(), 15);
    assert!(metrics.iter().all(|m| m.episodes == 5 && m.published == 5));
    assert!(metrics.iter().all(|m| m.last_score == 3.));

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.version(), 15);
    for (_, tensor) in snapshot.params().iter() {
        assert!(tensor.data().iter().all(|&v| (v + 1.5).abs() < 1e-5));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn server_workers_apply_every_gradient() {
    let config = ServerConfig {
        update_every: NonZeroUsize::new(5).unwrap(),
        mailbox: NonZeroUsize::new(2).unwrap(),
    };

    let (server, client) = ParameterServer::new(store(), config);
    let server = tokio::spawn(server.run());
    let coordinator = coordinator(100, f32::INFINITY);

    let metrics = run_workers(ServerPublisher::new(client), &coordinator, 3, 5).await;
    let report = server.await.unwrap();

    assert_eq!(report.store.step(), 15);
    assert_eq!(report.applied, 15);
    assert_eq!(report.target_refreshes, 3);
    assert_eq!(report.target.version(), 15);
    assert_eq!(coordinator.episodes(), 15);
    assert_eq!(metrics.iter().map(|m| m.published).sum::<u64>(), 15);
}

#[tokio::test(flavor = "multi_thread")]
async fn workers_stop_once_solved() {
    let handle = StoreHandle::new(store());
    // Every episode scores 3, so the third recorded episode solves the task.
    let coordinator = coordinator(3, 3.);
    let publisher = DirectPublisher::new(handle.clone());

    let metrics = run_workers(publisher, &coordinator, 1, 50).await;

    assert!(coordinator.is_solved());
    assert_eq!(coordinator.episodes(), 3);
    assert_eq!(metrics[0].episodes, 3);
    assert_eq!(handle.step(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn non_finite_backward_skips_publish() {
    let handle = StoreHandle::new(store());
    let coordinator = coordinator(100, f32::INFINITY);

    let model = UnitModel {
        layout: layout(),
        poisoned: true,
    };

    let worker = Worker::new(
        config(0, 4),
        ScriptedEnv { len: 2, t: 0 },
        model,
        DirectPublisher::new(handle.clone()),
        Arc::clone(&coordinator),
    )
    .unwrap();

    let metrics = worker.run().await.unwrap();

    assert_eq!(metrics.episodes, 4);
    assert_eq!(metrics.skipped, 4);
    assert_eq!(metrics.published, 0);
    assert_eq!(handle.step(), 0);
    assert_eq!(coordinator.episodes(), 4);
}

async fn run_truncated(train_truncated: bool) -> (WorkerMetrics, StoreHandle<GradientDescent>) {
    let handle = StoreHandle::new(store());
    let coordinator = coordinator(100, f32::INFINITY);

    let mut config = config(0, 4);
    config.max_steps = NonZeroUsize::new(3).unwrap();
    config.train_truncated = train_truncated;

    let model = UnitModel {
        layout: layout(),
        poisoned: false,
    };

    // The episode never ends on its own, `max_steps` cuts it off.
    let worker = Worker::new(
        config,
        ScriptedEnv { len: usize::MAX, t: 0 },
        model,
        DirectPublisher::new(handle.clone()),
        Arc::clone(&coordinator),
    )
    .unwrap();

    let metrics = worker.run().await.unwrap();
    assert_eq!(coordinator.episodes(), 4);

    (metrics, handle)
}

#[tokio::test(flavor = "multi_thread")]
async fn truncated_episode_skips_publish() {
    let (metrics, handle) = run_truncated(false).await;

    assert_eq!(metrics.episodes, 4);
    assert_eq!(metrics.truncated, 4);
    assert_eq!(metrics.published, 0);
    assert_eq!(metrics.last_score, 3.);
    assert_eq!(handle.step(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn truncated_episode_publishes_when_enabled() {
    let (metrics, handle) = run_truncated(true).await;

    assert_eq!(metrics.episodes, 4);
    assert_eq!(metrics.truncated, 0);
    assert_eq!(metrics.published, 4);
    assert_eq!(handle.step(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn mismatched_model_fails_to_start() {
    let handle = StoreHandle::new(store());

    let model = UnitModel {
        layout: Arc::new(ParameterLayout::default().with("w", [3, 1]).with("b", [2])),
        poisoned: false,
    };

    let res = Worker::new(
        config(0, 1),
        ScriptedEnv { len: 1, t: 0 },
        model,
        DirectPublisher::new(handle),
        coordinator(1, 0.),
    );

    assert!(matches!(res, Err(WorkerErr::ShapeMismatch(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn stopped_server_ends_the_worker() {
    let (server, client) = ParameterServer::new(store(), ServerConfig::default());
    drop(server);

    let model = UnitModel {
        layout: layout(),
        poisoned: false,
    };

    let worker = Worker::new(
        config(0, 3),
        ScriptedEnv { len: 1, t: 0 },
        model,
        ServerPublisher::new(client),
        coordinator(10, f32::INFINITY),
    )
    .unwrap();

    let err = worker.run().await.unwrap_err();
    assert!(matches!(err, WorkerErr::Server(_)));
}
