pub mod config;
pub mod error;
pub mod network;
pub mod nnet;
pub mod objective;
pub mod optimization;
pub mod training;

pub use config::{ObjectiveScales, TrainerConfig};
pub use error::{Result, TrainErr};
pub use training::NnetTrainer;
