//! XOR with a 2-2-1 sigmoid network.
//!
//! Usage: `brain-builder [--epochs N] [--seed N] [--lr X]`.
//! Set `RUST_LOG=info` to see training progress.

use brain_builder::{Activation, LossKind, NetworkBuilder, ScheduleConfig};

fn arg<T: std::str::FromStr>(args: &[String], key: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == key)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn main() -> brain_builder::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let epochs = arg(&args, "--epochs", 3500usize);
    let seed = arg(&args, "--seed", 0u64);
    let lr = arg(&args, "--lr", 5.0f64);

    let xs = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let ys = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];

    let mut net = NetworkBuilder::new()
        .dense(2, 2)
        .activation(Activation::Sigmoid)
        .dense(2, 1)
        .activation(Activation::Sigmoid)
        .learning_rate(lr)
        .loss(LossKind::Mse)
        .schedule(ScheduleConfig::constant())
        .build_with_seed(seed)?;

    let report = net.train(epochs, &xs, &ys)?;
    if let Some(loss) = report.final_loss() {
        println!("epochs={} final_loss={loss:.6}", report.epochs.len());
    }

    for p in net.predict(&xs, &ys)? {
        println!("x={:?} label={:?} y={:.4}", p.input, p.label, p.output[0]);
    }
    Ok(())
}
