use std::mem;

use ndarray::Array2;
use rand::Rng;

use super::layers::Dense;
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The model owns no parameters, every pass receives the flat parameter slice of the whole stack.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance or an error if two consecutive layers don't fit together.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Dense>,
    {
        let layers: Vec<Dense> = layers.into_iter().collect();

        for pair in layers.windows(2) {
            let (out_dim, in_dim) = (pair[0].dim().1, pair[1].dim().0);
            if out_dim != in_dim {
                return Err(MlErr::SizeMismatch {
                    what: "consecutive layer dimensions",
                    got: in_dim,
                    expected: out_dim,
                });
            }
        }

        Ok(Self { layers })
    }

    /// Returns the amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    /// The input dimension of the first layer, or `None` for an empty model.
    pub fn input_dim(&self) -> Option<usize> {
        self.layers.first().map(|layer| layer.dim().0)
    }

    /// The output dimension of the last layer, or `None` for an empty model.
    pub fn output_dim(&self) -> Option<usize> {
        self.layers.last().map(|layer| layer.dim().1)
    }

    /// Initializes every layer's slice of `params`.
    pub fn init_params<R: Rng>(&self, params: &mut [f32], rng: &mut R) -> Result<()> {
        self.check_len("params", params.len())?;

        let mut rest = params;
        for layer in &self.layers {
            let (head, tail) = mem::take(&mut rest).split_at_mut(layer.size());
            layer.init_params(head, rng)?;
            rest = tail;
        }

        Ok(())
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The parameters of the whole model.
    /// * `x` - The input data.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward(&mut self, params: &[f32], mut x: Array2<f32>) -> Result<Array2<f32>> {
        self.check_len("params", params.len())?;

        let mut rest = params;
        for layer in self.layers.iter_mut() {
            let (head, tail) = rest.split_at(layer.size());
            x = layer.forward(head, x)?;
            rest = tail;
        }

        Ok(x)
    }

    /// Backpropagates the output derivative `d` through every layer, last to first.
    ///
    /// # Arguments
    /// * `params` - The parameters of the whole model, as used in the forward pass.
    /// * `grad` - A buffer of the same size where `scale` times the derivatives are added.
    /// * `scale` - The factor applied to the parameter derivatives.
    /// * `d` - The derivative of the objective with respect to the model's output.
    ///
    /// # Returns
    /// The derivative with respect to the model's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        scale: f32,
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        self.check_len("params", params.len())?;
        self.check_len("grad", grad.len())?;

        let mut params_rest = params;
        let mut grad_rest = grad;

        for (i, layer) in self.layers.iter_mut().enumerate().rev() {
            let split = params_rest.len() - layer.size();
            let (params_head, params_tail) = params_rest.split_at(split);
            let (grad_head, grad_tail) = mem::take(&mut grad_rest).split_at_mut(split);

            d = layer
                .backward(params_tail, grad_tail, scale, d)
                .map_err(|e| match e {
                    MlErr::MissingForwardPass { .. } => MlErr::MissingForwardPass { layer: i },
                    other => other,
                })?;

            params_rest = params_head;
            grad_rest = grad_head;
        }

        Ok(d)
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}
