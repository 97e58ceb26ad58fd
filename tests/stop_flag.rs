use std::thread;
use std::time::Duration;

use brain_builder::{Activation, BrainBuilder, LossKind, NetworkBuilder, ScheduleConfig};

fn data() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    (
        vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ],
        vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]],
    )
}

fn net() -> BrainBuilder {
    NetworkBuilder::new()
        .dense(2, 4)
        .activation(Activation::TanH)
        .dense(4, 1)
        .activation(Activation::Sigmoid)
        .learning_rate(0.5)
        .loss(LossKind::Mse)
        .schedule(ScheduleConfig::step_decay(0.5, 1))
        .build_with_seed(9)
        .unwrap()
}

#[test]
fn preset_flag_finishes_one_sample_then_stops() {
    let (xs, ys) = data();
    let mut net = net();
    let before = net.feedforward(&xs[0]).unwrap();

    net.stop_flag().request_stop();
    let report = net.train(1000, &xs, &ys).unwrap();

    assert!(report.stopped);
    assert_eq!(report.epochs.len(), 1);
    assert_eq!(report.epochs[0].samples, 1);
    // The in-flight sample was learned from.
    assert_ne!(net.feedforward(&xs[0]).unwrap(), before);
    // A partial epoch does not advance the schedule.
    assert_eq!(net.scheduler().iteration(), 0);
    assert_eq!(net.learning_rate(), 0.5);

    let preds = net.predict(&xs, &ys).unwrap();
    assert_eq!(preds.len(), 4);
    for p in preds {
        assert_eq!(p.output.len(), 1);
        assert!(p.output[0].is_finite());
    }
}

#[test]
fn flag_stays_set_until_reset() {
    let (xs, ys) = data();
    let mut net = net();
    let flag = net.stop_flag();

    flag.request_stop();
    assert!(net.train(10, &xs, &ys).unwrap().stopped);
    assert!(net.train(10, &xs, &ys).unwrap().stopped);

    flag.reset();
    let report = net.train(10, &xs, &ys).unwrap();
    assert!(!report.stopped);
    assert_eq!(report.epochs.len(), 10);
    assert!(report.epochs.iter().all(|e| e.samples == 4));
}

#[test]
fn flag_set_from_another_thread_interrupts_a_long_run() {
    let (xs, ys) = data();
    let mut net = net();
    let flag = net.stop_flag();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        flag.request_stop();
    });

    let max_iterations = 50_000_000;
    let report = net.train(max_iterations, &xs, &ys).unwrap();
    stopper.join().unwrap();

    assert!(report.stopped);
    assert!(report.epochs.len() < max_iterations);
    assert!(report.final_loss().unwrap().is_finite());
}

#[test]
fn clones_do_not_share_the_flag() {
    let (xs, ys) = data();
    let original = net();
    let mut copy = original.clone();

    original.stop_flag().request_stop();
    let report = copy.train(3, &xs, &ys).unwrap();
    assert!(!report.stopped);
    assert_eq!(report.epochs.len(), 3);
}
