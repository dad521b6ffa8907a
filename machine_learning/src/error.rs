use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },
    MissingForwardPass {
        layer: usize,
    },
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::IndexOutOfBounds { what, index, len } => write!(
                f,
                "Index {index} is out of bounds for {what} of length {len}"
            ),
            MlErr::MissingForwardPass { layer } => write!(
                f,
                "Tried to run a backward pass through layer {layer} before forwarding it"
            ),
        }
    }
}

impl Error for MlErr {}
