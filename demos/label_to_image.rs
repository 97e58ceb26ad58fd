//! Generate an 8x8 image from a one-hot class label.
//!
//! Each class has a fixed synthetic pattern (bars, a frame, a diagonal). The
//! network learns label -> pixels, then the demo renders every class and one
//! blend of two labels as ASCII art.

use brain_builder::{Activation, LossKind, NetworkBuilder, ScheduleConfig};

const SIDE: usize = 8;
const CLASSES: usize = 4;

fn pattern(class: usize) -> Vec<f64> {
    let mut img = vec![0.0; SIDE * SIDE];
    for r in 0..SIDE {
        for c in 0..SIDE {
            let on = match class {
                0 => c == 3 || c == 4,
                1 => r == 3 || r == 4,
                2 => r == 0 || c == 0 || r == SIDE - 1 || c == SIDE - 1,
                _ => r == c || r + c == SIDE - 1,
            };
            if on {
                img[r * SIDE + c] = 1.0;
            }
        }
    }
    img
}

fn render(pixels: &[f64]) -> String {
    let mut s = String::with_capacity(SIDE * (SIDE + 1));
    for row in pixels.chunks(SIDE) {
        for &p in row {
            s.push(match p {
                p if p > 0.75 => '#',
                p if p > 0.5 => '+',
                p if p > 0.25 => '.',
                _ => ' ',
            });
        }
        s.push('\n');
    }
    s
}

fn main() -> brain_builder::Result<()> {
    env_logger::init();

    let labels: Vec<Vec<f64>> = (0..CLASSES)
        .map(|k| {
            let mut one_hot = vec![0.0; CLASSES];
            one_hot[k] = 1.0;
            one_hot
        })
        .collect();
    let images: Vec<Vec<f64>> = (0..CLASSES).map(pattern).collect();

    let mut net = NetworkBuilder::new()
        .dense(CLASSES, 16)
        .activation(Activation::TanH)
        .dense(16, SIDE * SIDE)
        .activation(Activation::Sigmoid)
        .learning_rate(1.0)
        .loss(LossKind::Mse)
        .schedule(ScheduleConfig::step_decay(0.5, 1000))
        .build_with_seed(3)?;

    let report = net.train(3000, &labels, &images)?;
    if let Some(loss) = report.final_loss() {
        println!("final_loss={loss:.6}");
    }

    for p in net.predict(&labels, &images)? {
        println!("label {:?}\n{}", p.label, render(&p.output));
    }

    let blend = net.feedforward(&[0.5, 0.5, 0.0, 0.0])?;
    println!("blend of 0 and 1\n{}", render(&blend));
    Ok(())
}
