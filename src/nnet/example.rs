use machine_learning::matrix::GeneralMatrix;
use ndarray::Array1;

/// A named input or output of an example.
#[derive(Debug, Clone, PartialEq)]
pub struct NnetIo {
    pub name: String,
    /// Input features, or the supervision of an output.
    pub features: GeneralMatrix,
    /// Per row weights the output derivative is multiplied by.
    pub deriv_weights: Option<Array1<f32>>,
}

impl NnetIo {
    pub fn new<S, M>(name: S, features: M) -> Self
    where
        S: Into<String>,
        M: Into<GeneralMatrix>,
    {
        Self {
            name: name.into(),
            features: features.into(),
            deriv_weights: None,
        }
    }

    pub fn with_deriv_weights(mut self, deriv_weights: Array1<f32>) -> Self {
        self.deriv_weights = Some(deriv_weights);
        self
    }
}

/// A minibatch of training data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NnetExample {
    pub io: Vec<NnetIo>,
}

impl NnetExample {
    pub fn new<I>(io: I) -> Self
    where
        I: IntoIterator<Item = NnetIo>,
    {
        Self {
            io: io.into_iter().collect(),
        }
    }
}
