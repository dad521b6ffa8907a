mod stats;
mod trainer;

pub use stats::{AverageObjf, ObjectiveFunctionInfo, PhaseReport};
pub use trainer::NnetTrainer;
