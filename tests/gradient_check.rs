//! Finite-difference checks of the gradients returned by `BrainBuilder::learn`.

use approx::assert_abs_diff_eq;

use brain_builder::{Activation, BrainBuilder, Layer, LossKind, NetworkBuilder, NetworkLayer};

const EPS: f64 = 1e-6;

fn loss_at(net: &BrainBuilder, x: &[f64], y: &[f64]) -> f64 {
    let mut probe = net.clone();
    let out = probe.feedforward(x).unwrap();
    probe.get_loss(&out, y).unwrap()
}

fn check_input_gradient(net: &BrainBuilder, x: &[f64], y: &[f64]) {
    let mut work = net.clone();
    let out = work.feedforward(x).unwrap();
    let analytic = work.learn(&out, y).unwrap();
    assert_eq!(analytic.len(), x.len());

    for i in 0..x.len() {
        let mut plus = x.to_vec();
        plus[i] += EPS;
        let mut minus = x.to_vec();
        minus[i] -= EPS;
        let numeric = (loss_at(net, &plus, y) - loss_at(net, &minus, y)) / (2.0 * EPS);
        assert_abs_diff_eq!(analytic[i], numeric, epsilon = 1e-4);
    }
}

#[test]
fn input_gradient_matches_finite_differences_for_each_loss() {
    let x = [0.4, -0.9, 0.25];
    let cases = [
        (LossKind::Mse, Activation::Sigmoid, vec![0.2, 0.7]),
        (LossKind::Mae, Activation::TanH, vec![0.9, -0.6]),
        (LossKind::LogLoss, Activation::Sigmoid, vec![1.0, 0.0]),
    ];
    for (loss, out_act, y) in cases {
        let net = NetworkBuilder::new()
            .dense(3, 4)
            .activation(Activation::TanH)
            .dense(4, 2)
            .activation(out_act)
            .loss(loss)
            .build_with_seed(17)
            .unwrap();
        check_input_gradient(&net, &x, &y);
    }
}

#[test]
fn cross_entropy_gradient_through_raw_scores() {
    let net = NetworkBuilder::new()
        .dense(3, 5)
        .activation(Activation::Elu { alpha: 1.0 })
        .dense(5, 3)
        .loss(LossKind::CrossEntropy)
        .build_with_seed(4)
        .unwrap();
    check_input_gradient(&net, &[0.3, 0.1, -0.2], &[0.0, 1.0, 0.0]);
}

#[test]
fn gradient_passes_through_batch_norm() {
    let net = NetworkBuilder::new()
        .dense(3, 4)
        .batch_norm(4)
        .activation(Activation::leaky_relu())
        .dense(4, 1)
        .build_with_seed(8)
        .unwrap();
    check_input_gradient(&net, &[1.2, -0.3, 0.5], &[0.5]);
}

#[test]
fn first_layer_weight_gradient_matches_finite_differences() {
    let net = NetworkBuilder::new()
        .dense(2, 3)
        .activation(Activation::Sigmoid)
        .dense(3, 1)
        .activation(Activation::Sigmoid)
        .learning_rate(1.0)
        .build_with_seed(12)
        .unwrap();
    let x = [0.7, -0.4];
    let y = [1.0];

    let weights_of = |n: &BrainBuilder| match &n.layers()[0] {
        NetworkLayer::Dense(d) => d.weights().to_vec(),
        other => panic!("expected dense layer, got {}", other.kind_name()),
    };

    // With rate 1, the step taken by `learn` is exactly -dL/dW.
    let mut stepped = net.clone();
    let out = stepped.feedforward(&x).unwrap();
    stepped.learn(&out, &y).unwrap();
    let before = weights_of(&net);
    let after = weights_of(&stepped);

    for p in 0..before.len() {
        let nudged = |delta: f64| {
            let mut n = net.clone();
            if let NetworkLayer::Dense(d) = &mut n.layers_mut()[0] {
                d.weights_mut()[p] += delta;
            }
            loss_at(&n, &x, &y)
        };
        let numeric = (nudged(EPS) - nudged(-EPS)) / (2.0 * EPS);
        assert_abs_diff_eq!(before[p] - after[p], numeric, epsilon = 1e-4);
    }
    assert_eq!(net.layers()[0].input_len(), Some(2));
}
