#[cfg(not(feature = "serde"))]
fn main() {
    println!("enable the `serde` feature: cargo run --example save_load_json --features serde");
}

#[cfg(feature = "serde")]
fn main() -> brain_builder::Result<()> {
    use brain_builder::{Activation, BrainBuilder, LossKind, NetworkBuilder, ScheduleConfig};

    env_logger::init();

    let xs = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let ys = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];

    let mut net = NetworkBuilder::new()
        .dense(2, 8)
        .activation(Activation::TanH)
        .dense(8, 1)
        .activation(Activation::Sigmoid)
        .learning_rate(0.5)
        .loss(LossKind::Mse)
        .schedule(ScheduleConfig::exponential_decay(1e-3))
        .build_with_seed(0)?;

    net.train(500, &xs, &ys)?;

    let path = std::env::temp_dir().join("brain_builder_xor.json");
    net.save_json(&path)?;

    let mut loaded = BrainBuilder::load_json(&path)?;
    for x in &xs {
        let a = net.feedforward(x)?;
        let b = loaded.feedforward(x)?;
        println!("x={x:?} original={:.6} loaded={:.6} identical={}", a[0], b[0], a == b);
    }
    println!(
        "saved and loaded model: {} (lr {} after {} epochs)",
        path.display(),
        loaded.learning_rate(),
        loaded.scheduler().iteration()
    );
    Ok(())
}
