mod regularizer;
mod supervised;

use std::{fmt, str::FromStr};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::TrainErr;

pub use regularizer::compute_regularizer;
pub use supervised::compute_objective_function;

/// The objective function an output node is trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectiveType {
    /// `x * y`, for outputs that are already log-probabilities.
    Linear,
    /// `-0.5 * (x - y)^2`.
    Quadratic,
    /// Binary cross entropy `x * log(y) + (1 - x) * log(1 - y)`.
    CrossEntropy,
}

impl fmt::Display for ObjectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectiveType::Linear => "linear",
            ObjectiveType::Quadratic => "quadratic",
            ObjectiveType::CrossEntropy => "cross-entropy",
        };

        write!(f, "{s}")
    }
}

impl FromStr for ObjectiveType {
    type Err = TrainErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(ObjectiveType::Linear),
            "quadratic" => Ok(ObjectiveType::Quadratic),
            "cross-entropy" | "xent" => Ok(ObjectiveType::CrossEntropy),
            other => Err(TrainErr::UnknownObjective(other.to_string())),
        }
    }
}

/// The value of an objective over one minibatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// The weight the objective is normalized by when reported, usually a frame count.
    pub tot_weight: f32,
    pub tot_objf: f32,
    /// The derivative of `tot_objf` with respect to the output, when requested.
    pub deriv: Option<Array2<f32>>,
}
