//! Classify noisy 5x5 digit glyphs.
//!
//! Trains on jittered copies of ten hand-drawn glyphs with categorical
//! cross-entropy (the network emits raw scores; the loss applies softmax) and
//! reports held-out accuracy. Ctrl-C style interruption is shown with a
//! [`StopFlag`](brain_builder::StopFlag) tripped once the loss is small enough.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use brain_builder::{Activation, LossKind, NetworkBuilder, Prediction, ScheduleConfig};

const GLYPHS: [&str; 10] = [
    " ### #   ##   ##   # ### ",
    "  #   ##    #    #   ### ",
    "####     # ### #    #####",
    "####     # ###     ##### ",
    "#   ##   ######    #    #",
    "######    ####     ##### ",
    " ### #    #### #   # ### ",
    "#####    #   #   #    #  ",
    " ### #   # ### #   # ### ",
    " ### #   # ####    # ### ",
];

fn glyph(digit: usize) -> Vec<f64> {
    GLYPHS[digit]
        .chars()
        .map(|c| if c == '#' { 1.0 } else { 0.0 })
        .collect()
}

fn noisy_samples(rng: &mut StdRng, per_digit: usize) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let mut xs = Vec::with_capacity(10 * per_digit);
    let mut ys = Vec::with_capacity(10 * per_digit);
    for digit in 0..10 {
        let clean = glyph(digit);
        for _ in 0..per_digit {
            let x = clean
                .iter()
                .map(|&p| {
                    let flipped = if rng.gen_bool(0.05) { 1.0 - p } else { p };
                    (flipped + rng.gen_range(-0.1..0.1)).clamp(0.0, 1.0)
                })
                .collect();
            let mut one_hot = vec![0.0; 10];
            one_hot[digit] = 1.0;
            xs.push(x);
            ys.push(one_hot);
        }
    }
    (xs, ys)
}

fn accuracy(preds: &[Prediction]) -> f64 {
    let hits = preds
        .iter()
        .filter(|p| p.argmax() == p.label_argmax())
        .count();
    hits as f64 / preds.len() as f64
}

fn main() -> brain_builder::Result<()> {
    env_logger::init();

    let mut rng = StdRng::seed_from_u64(0);
    let (train_x, train_y) = noisy_samples(&mut rng, 20);
    let (test_x, test_y) = noisy_samples(&mut rng, 10);

    let mut net = NetworkBuilder::new()
        .dense(25, 32)
        .activation(Activation::leaky_relu())
        .dense(32, 10)
        .learning_rate(0.05)
        .loss(LossKind::CrossEntropy)
        .schedule(ScheduleConfig::cosine_annealing(300))
        .build_with_seed(1)?;

    let stop = net.stop_flag();
    let report = net.train_with_observer(300, &train_x, &train_y, |epoch| {
        if epoch.epoch % 50 == 0 {
            println!(
                "epoch {:>3} loss={:.4} lr={:.4}",
                epoch.epoch, epoch.average_loss, epoch.learning_rate
            );
        }
        if epoch.average_loss < 0.01 {
            stop.request_stop();
        }
    })?;
    println!(
        "trained {} epochs (stopped early: {})",
        report.epochs.len(),
        report.stopped
    );

    let train_acc = accuracy(&net.predict(&train_x, &train_y)?);
    let test_acc = accuracy(&net.predict(&test_x, &test_y)?);
    println!("train_acc={train_acc:.3} test_acc={test_acc:.3}");
    Ok(())
}
