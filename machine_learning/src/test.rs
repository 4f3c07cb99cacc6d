#![cfg(test)]

use std::sync::Arc;

use parameter_server::ParameterSet;
use rand::{Rng, SeedableRng, rngs::StdRng};
use worker::{Model, Trajectory, Transition};

use crate::{LinearActorCritic, LinearQ};

const STATE_DIM: usize = 3;
const ACTIONS: usize = 2;

fn random_params(model: &impl Model, rng: &mut StdRng) -> ParameterSet {
    let mut params = ParameterSet::zeros(model.layout());
    for tensor in params.tensors_mut() {
        tensor
            .data_mut()
            .iter_mut()
            .for_each(|v| *v = rng.random_range(-0.5..0.5));
    }
    params
}

fn trajectory(rng: &mut StdRng, len: usize) -> Trajectory {
    let mut trajectory = Trajectory::new();
    let mut state: Vec<f32> = (0..STATE_DIM).map(|_| rng.random_range(-1.0..1.0)).collect();

    for i in 0..len {
        let next_state: Vec<f32> = (0..STATE_DIM).map(|_| rng.random_range(-1.0..1.0)).collect();
        trajectory.push(Transition {
            state,
            action: rng.random_range(0..ACTIONS),
            reward: rng.random_range(-1.0..1.0),
            next_state: next_state.clone(),
            done: i + 1 == len,
        });
        state = next_state;
    }

    trajectory
}

/// Compares the analytic gradient of the tensors named in `names` with central differences.
fn check_gradient(
    model: &impl Model,
    params: &ParameterSet,
    target: Option<&ParameterSet>,
    trajectory: &Trajectory,
    names: &[&str],
) {
    const EPS: f32 = 1e-2;

    let analytic = model.backward(trajectory, params, target, 0.9).unwrap();
    assert!(analytic.is_finite());

    for &name in names {
        let len = params.get(name).unwrap().len();

        for k in 0..len {
            let mut plus = params.clone();
            plus.get_mut(name).unwrap().data_mut()[k] += EPS;
            let mut minus = params.clone();
            minus.get_mut(name).unwrap().data_mut()[k] -= EPS;

            let lp = model.backward(trajectory, &plus, target, 0.9).unwrap().loss;
            let lm = model.backward(trajectory, &minus, target, 0.9).unwrap().loss;
            let numeric = (lp - lm) / (2. * EPS);
            let got = analytic.grads.get(name).unwrap().data()[k];

            assert!(
                (numeric - got).abs() < 1e-2 + 1e-2 * numeric.abs(),
                "{name}[{k}]: numeric {numeric}, analytic {got}"
            );
        }
    }
}

#[test]
fn test_q_network_gradient() {
    let mut rng = StdRng::seed_from_u64(42);
    let model = LinearQ::new(STATE_DIM, ACTIONS);
    let params = random_params(&model, &mut rng);
    let target = random_params(&model, &mut rng);
    let trajectory = trajectory(&mut rng, 6);

    check_gradient(&model, &params, Some(&target), &trajectory, &["q.weight", "q.bias"]);
}

#[test]
fn test_actor_critic_policy_gradient() {
    let mut rng = StdRng::seed_from_u64(7);
    let model = LinearActorCritic::new(STATE_DIM, ACTIONS);
    let params = random_params(&model, &mut rng);
    let trajectory = trajectory(&mut rng, 5);

    check_gradient(&model, &params, None, &trajectory, &["policy.weight", "policy.bias"]);
}

#[test]
fn test_actor_critic_value_gradient() {
    let model = LinearActorCritic::new(1, ACTIONS);
    let params = ParameterSet::zeros(model.layout());

    let mut trajectory = Trajectory::new();
    for reward in [1., 2.] {
        trajectory.push(Transition {
            state: vec![1.],
            action: 0,
            reward,
            next_state: vec![1.],
            done: false,
        });
    }

    // Returns with gamma 0.5 are [2, 2], the value head predicts 0 everywhere.
    let backward = model.backward(&trajectory, &params, None, 0.5).unwrap();
    let db = backward.grads.get("value.bias").unwrap().data()[0];
    assert!((db - -2.).abs() < 1e-6);
}

#[test]
fn test_forward_shapes() {
    let q = LinearQ::new(STATE_DIM, ACTIONS);
    let params = ParameterSet::zeros(q.layout());

    assert_eq!(q.forward(&params, &[0.; STATE_DIM]).unwrap(), vec![0.; ACTIONS]);
    assert!(q.forward(&params, &[0.; 1]).is_err());

    let ac = LinearActorCritic::new(STATE_DIM, ACTIONS);
    assert_eq!(ac.layout().len(), 4);
    assert!(ac.forward(&ParameterSet::zeros(ac.layout()), &[1.; STATE_DIM]).is_ok());
}

#[test]
fn test_empty_trajectory_has_zero_gradient() {
    let q = LinearQ::new(STATE_DIM, ACTIONS);
    let params = ParameterSet::zeros(q.layout());
    let backward = q.backward(&Trajectory::new(), &params, None, 0.99).unwrap();

    assert_eq!(backward.loss, 0.);
    assert_eq!(backward.grads, ParameterSet::zeros(Arc::clone(params.layout())));
}
