use std::env;

use anyhow::{ensure, Context, Result};
use log::info;
use machine_learning::{
    arch::{activations::ActFn, layers::Dense},
    matrix::CompressedMatrix,
};
use ndarray::Array2;
use nnet_training::{
    network::{NetworkBuilder, NetworkCompiler},
    nnet::{NnetExample, NnetIo},
    objective::ObjectiveType,
    NnetTrainer, TrainerConfig,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const DEFAULT_MINIBATCHES: usize = 500;
const MINIBATCH_SIZE: usize = 16;
const INPUT_DIM: usize = 4;

/// A minibatch of a synthetic regression task, every other one with compressed supervision.
fn synthetic_example<R: Rng>(rng: &mut R, compressed: bool) -> NnetExample {
    let x = Array2::<f32>::from_shape_fn((MINIBATCH_SIZE, INPUT_DIM), |_| {
        rng.random_range(-1.0..1.0)
    });
    let y = Array2::from_shape_fn((MINIBATCH_SIZE, 2), |(i, j)| {
        0.5 * (x[[i, 2 * j]] + x[[i, 2 * j + 1]])
    });

    let output = if compressed {
        NnetIo::new("output", CompressedMatrix::from_dense(y.view()))
    } else {
        NnetIo::new("output", y)
    };

    NnetExample::new([NnetIo::new("input", x), output])
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => TrainerConfig::from_path(&path)
            .with_context(|| format!("could not load config from '{path}'"))?,
        None => TrainerConfig::default(),
    };
    let num_minibatches = match args.next() {
        Some(n) => n.parse().context("the amount of minibatches must be an integer")?,
        None => DEFAULT_MINIBATCHES,
    };

    let mut rng = StdRng::seed_from_u64(0);
    let mut network = NetworkBuilder::new()
        .input("input", INPUT_DIM)
        .output(
            "output",
            "input",
            [
                Dense::new((INPUT_DIM, 8), Some(ActFn::sigmoid(1.0))),
                Dense::new((8, 2), None),
            ],
            ObjectiveType::Quadratic,
        )
        .output(
            "output-reg",
            "input",
            [Dense::new((INPUT_DIM, 1), None)],
            ObjectiveType::Quadratic,
        )
        .learning_rate(0.01)
        .build()?;
    network.randomize_params(&mut rng)?;

    info!(minibatches = num_minibatches; "training with {config:?}");

    let mut trainer = NnetTrainer::new(config, &mut network, NetworkCompiler::new())?;
    for i in 0..num_minibatches {
        let eg = synthetic_example(&mut rng, i % 2 == 1);
        trainer.train(&eg)?;
    }

    ensure!(trainer.print_total_stats(), "no frames were trained on");
    Ok(())
}
