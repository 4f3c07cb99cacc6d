#![cfg(test)]

use std::{num::NonZeroUsize, sync::Arc};

use crate::{
    initialization::ConstParamGen,
    optimization::GradientDescent,
    parameters::{ParameterLayout, ParameterSet},
    service::{ParameterServer, ServerClient, ServerConfig, ServerErr},
    storage::{ParameterStore, ShapeMismatchErr},
};

fn layout() -> Arc<ParameterLayout> {
    Arc::new(ParameterLayout::default().with("q.weight", [2, 3]).with("q.bias", [2]))
}

fn server(update_every: usize) -> (ParameterServer<GradientDescent>, ServerClient) {
    let store = ParameterStore::new(layout(), ConstParamGen::new(0.), |_| {
        GradientDescent::new(1.)
    })
    .unwrap();

    let config = ServerConfig {
        update_every: NonZeroUsize::new(update_every).unwrap(),
        mailbox: NonZeroUsize::new(4).unwrap(),
    };

    ParameterServer::new(store, config)
}

fn unit_grad(client: &ServerClient) -> ParameterSet {
    let mut grad = ParameterSet::zeros(Arc::clone(client.layout()));
    grad.fill(1.);
    grad
}

#[tokio::test(flavor = "multi_thread")]
async fn test_target_refresh_cadence() {
    let (server, client) = server(5);
    let task = tokio::spawn(server.run());
    let initial = client.get_target_parameters();

    for step in 1..=12u64 {
        let version = client.get_parameters().version();
        let applied = client.record_gradient(0, version, unit_grad(&client)).await.unwrap();
        assert_eq!(applied, step);

        let target = client.get_target_parameters();
        match step {
            1..=4 => assert_eq!(*target, *initial),
            5..=9 => assert_eq!(target.version(), 5),
            _ => assert_eq!(target.version(), 10),
        }

        if step == 5 || step == 10 {
            assert_eq!(*target, *client.get_parameters());
        }
    }

    drop(client);
    let report = task.await.unwrap();
    assert_eq!(report.applied, 12);
    assert_eq!(report.target_refreshes, 2);
    assert_eq!(report.store.step(), 12);
    assert_eq!(report.target.params().get("q.bias").unwrap().data(), [-10., -10.]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_clients_are_serialized() {
    const CLIENTS: usize = 4;
    const UPDATES: usize = 25;

    let (server, client) = server(3);
    let task = tokio::spawn(server.run());

    let handles: Vec<_> = (0..CLIENTS)
        .map(|worker_id| {
            let client = client.clone();
            tokio::spawn(async move {
                for _ in 0..UPDATES {
                    let version = client.get_parameters().version();
                    let grad = unit_grad(&client);
                    client.record_gradient(worker_id, version, grad).await.unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    drop(client);
    let report = task.await.unwrap();
    let total = (CLIENTS * UPDATES) as u64;
    assert_eq!(report.applied, total);
    assert_eq!(report.store.step(), total);
    assert_eq!(report.target_refreshes, total / 3);

    let snapshot = report.store.snapshot();
    for (_, tensor) in snapshot.params().iter() {
        assert!(tensor.data().iter().all(|&v| v == -(total as f32)));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stale_gradient_is_applied() {
    let (server, client) = server(100);
    let task = tokio::spawn(server.run());

    for step in 1..=3u64 {
        let applied = client.record_gradient(1, step - 1, unit_grad(&client)).await.unwrap();
        assert_eq!(applied, step);
    }

    // Computed against the initial parameters, three updates behind.
    let applied = client.record_gradient(0, 0, unit_grad(&client)).await.unwrap();
    assert_eq!(applied, 4);

    let online = client.get_parameters();
    assert_eq!(online.version(), 4);
    assert_eq!(online.params().get("q.bias").unwrap().data(), [-4., -4.]);

    drop(client);
    let report = task.await.unwrap();
    assert_eq!(report.applied, 4);
    assert_eq!(report.target_refreshes, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mismatched_gradient_is_rejected() {
    let (server, client) = server(1);
    let task = tokio::spawn(server.run());

    let other = Arc::new(ParameterLayout::default().with("q.weight", [3, 2]).with("q.bias", [2]));
    let err = client
        .record_gradient(0, 0, ParameterSet::zeros(other))
        .await
        .unwrap_err();

    assert!(matches!(err, ServerErr::ShapeMismatch(ShapeMismatchErr::Tensor { .. })));
    assert_eq!(client.get_parameters().version(), 0);
    assert_eq!(client.get_target_parameters().version(), 0);

    drop(client);
    let report = task.await.unwrap();
    assert_eq!(report.applied, 0);
    assert_eq!(report.target_refreshes, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stopped_server_is_unavailable() {
    let (server, client) = server(1);
    drop(server);

    let err = client.record_gradient(0, 0, unit_grad(&client)).await.unwrap_err();
    assert_eq!(err, ServerErr::Unavailable);
}
