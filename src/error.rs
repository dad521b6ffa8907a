use std::{error::Error, fmt, io};

use machine_learning::MlErr;

use crate::objective::ObjectiveType;

/// The training module's result type.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// Training failures. Every variant but `Io` and `Json` signals a misconfiguration or a broken
/// internal invariant, training can't go on after any of them.
#[derive(Debug)]
pub enum TrainErr {
    Io(io::Error),
    Json(serde_json::Error),
    Ml(MlErr),
    InvalidConfig(String),
    ObjectiveScales {
        config: String,
        reason: String,
    },
    UnknownObjective(String),
    DimensionMismatch {
        output: String,
        what: &'static str,
        nnet: usize,
        egs: usize,
    },
    UnsupportedRegularizer {
        output: String,
        objective: ObjectiveType,
    },
    UnknownNode(String),
    NotAnInput(String),
    NotAnOutput(String),
    InvalidNetwork(String),
    MissingInput(String),
    MissingOutput(String),
    MissingOutputDeriv(String),
    UnexpectedOutputDeriv(String),
    PhaseJump {
        output: String,
        current: usize,
        got: usize,
    },
}

impl fmt::Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::Io(e) => write!(f, "io error: {e}"),
            TrainErr::Json(e) => write!(f, "invalid json config: {e}"),
            TrainErr::Ml(e) => write!(f, "{e}"),
            TrainErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            TrainErr::ObjectiveScales { config, reason } => {
                write!(f, "incorrect format for objective scales '{config}': {reason}")
            }
            TrainErr::UnknownObjective(name) => write!(f, "unknown objective type '{name}'"),
            TrainErr::DimensionMismatch {
                output,
                what,
                nnet,
                egs,
            } => write!(
                f,
                "nnet versus example {what} mismatch for '{output}': {nnet} (nnet) vs. {egs} (egs)"
            ),
            TrainErr::UnsupportedRegularizer { output, objective } => write!(
                f,
                "regularizer objective type {objective} not handled for '{output}'"
            ),
            TrainErr::UnknownNode(name) => write!(f, "no input or output node named '{name}'"),
            TrainErr::NotAnInput(name) => write!(f, "node '{name}' is not an input node"),
            TrainErr::NotAnOutput(name) => write!(f, "node '{name}' is not an output node"),
            TrainErr::InvalidNetwork(msg) => write!(f, "invalid network: {msg}"),
            TrainErr::MissingInput(name) => write!(f, "missing input '{name}'"),
            TrainErr::MissingOutput(name) => {
                write!(f, "output '{name}' was not computed by this computation")
            }
            TrainErr::MissingOutputDeriv(name) => {
                write!(f, "no derivative was supplied for output '{name}'")
            }
            TrainErr::UnexpectedOutputDeriv(name) => {
                write!(f, "output '{name}' was not requested with a derivative")
            }
            TrainErr::PhaseJump {
                output,
                current,
                got,
            } => write!(
                f,
                "statistics for '{output}' jumped from phase {current} to phase {got}"
            ),
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainErr::Io(e) => Some(e),
            TrainErr::Json(e) => Some(e),
            TrainErr::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrainErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for TrainErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<MlErr> for TrainErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}
