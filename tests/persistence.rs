#![cfg(feature = "serde")]

use brain_builder::{Activation, BrainBuilder, Error, LossKind, NetworkBuilder, ScheduleConfig};

fn trained() -> (BrainBuilder, Vec<Vec<f64>>) {
    let xs = vec![
        vec![0.1, 0.9, 0.3],
        vec![0.8, 0.2, 0.5],
        vec![0.4, 0.4, 0.9],
    ];
    let ys = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]];
    let mut net = NetworkBuilder::new()
        .dense(3, 5)
        .batch_norm(5)
        .activation(Activation::Elu { alpha: 0.7 })
        .dense(5, 4)
        .activation(Activation::LeakyReLU { coef: 0.05 })
        .dense(4, 2)
        .activation(Activation::Sigmoid)
        .learning_rate(0.3)
        .loss(LossKind::LogLoss)
        .schedule(ScheduleConfig::time_based_decay(0.01).with_momentum(0.2))
        .build_with_seed(5)
        .unwrap();
    net.train(25, &xs, &ys).unwrap();
    (net, xs)
}

#[test]
fn save_then_load_gives_bit_identical_outputs() {
    let (mut net, xs) = trained();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("net.json");

    net.save_json(&path).unwrap();
    let mut loaded = BrainBuilder::load_json(&path).unwrap();

    for x in &xs {
        let a = net.feedforward(x).unwrap();
        let b = loaded.feedforward(x).unwrap();
        assert_eq!(
            a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }
    assert_eq!(loaded.loss_kind(), LossKind::LogLoss);
    assert_eq!(loaded.scheduler(), net.scheduler());
}

#[test]
fn loaded_network_continues_training_identically() {
    let (mut net, xs) = trained();
    let ys = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]];
    let mut loaded = BrainBuilder::from_json_str(&net.to_json_string().unwrap()).unwrap();

    let a = net.train(10, &xs, &ys).unwrap();
    let b = loaded.train(10, &xs, &ys).unwrap();
    assert_eq!(a, b);
    assert_eq!(net.to_json_string().unwrap(), loaded.to_json_string().unwrap());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BrainBuilder::load_json(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn tampered_shapes_are_rejected() {
    let (net, _) = trained();
    let json = net.to_json_string().unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["layers"][0]["output_len"] = serde_json::json!(6);
    let err = BrainBuilder::from_json_str(&value.to_string()).unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
}
