use ndarray::{linalg, prelude::*};
use rand::Rng;

use crate::{MlErr, Result, arch::activations::ActFn};

/// A fully connected layer over a flat parameter slice: the `dim.0 x dim.1` weights come first,
/// in row major order, followed by the `dim.1` biases.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Option<Array2<f32>>,
    z: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The input and output dimensions of the layer.
    /// * `act_fn` - An optional activation applied to the affine output.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: None,
            z: Array2::zeros((0, dim.1)),
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Fills `params` with Glorot uniform weights and zero biases.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of parameters.
    /// * `rng` - A random number generator.
    pub fn init_params<R: Rng>(&self, params: &mut [f32], rng: &mut R) -> Result<()> {
        self.check_len("params", params.len())?;

        let limit = (6. / (self.dim.0 + self.dim.1) as f32).sqrt();
        let (weights, biases) = params.split_at_mut(self.size - self.dim.1);
        weights
            .iter_mut()
            .for_each(|w| *w = rng.random_range(-limit..=limit));
        biases.fill(0.);

        Ok(())
    }

    /// Makes a forward pass through the layer, keeping what the backward pass needs.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of parameters.
    /// * `x` - The input, one row per frame.
    ///
    /// # Returns
    /// The layer's output.
    pub fn forward(&mut self, params: &[f32], x: Array2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "dense input columns",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        let mut z = x.dot(&w);
        z += &b;

        let a = match &self.act_fn {
            Some(act_fn) => z.mapv(|z| act_fn.f(z)),
            None => z.clone(),
        };

        self.x = Some(x);
        self.z = z;
        Ok(a)
    }

    /// Backpropagates `d`, the derivative of the objective with respect to this layer's output.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of parameters, as used in the forward pass.
    /// * `grad` - A buffer where `scale` times the parameter derivatives are **added**.
    /// * `scale` - The factor applied to the parameter derivatives.
    /// * `d` - The output derivative.
    ///
    /// # Returns
    /// The derivative with respect to this layer's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        scale: f32,
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let x = self.x.take().ok_or(MlErr::MissingForwardPass { layer: 0 })?;

        if d.dim() != self.z.dim() {
            return Err(MlErr::SizeMismatch {
                what: "dense output derivative rows",
                got: d.nrows(),
                expected: self.z.nrows(),
            });
        }

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (w, _) = self.view_params(params)?;
        let d_in = d.dot(&w.t());

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(scale, &x.t(), &d, 1.0, &mut dw);
        db.scaled_add(scale, &d.sum_axis(Axis(0)));

        Ok(d_in)
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        self.check_len("grad", grad.len())?;

        let (dw_raw, db_raw) = grad.split_at_mut(self.size - self.dim.1);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).map_err(|_| self.shape_err())?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw).map_err(|_| self.shape_err())?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len("params", params.len())?;

        let (w_raw, b_raw) = params.split_at(self.size - self.dim.1);
        let weights = ArrayView2::from_shape(self.dim, w_raw).map_err(|_| self.shape_err())?;
        let biases = ArrayView1::from_shape(self.dim.1, b_raw).map_err(|_| self.shape_err())?;
        Ok((weights, biases))
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        if got != self.size {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected: self.size,
            });
        }

        Ok(())
    }

    fn shape_err(&self) -> MlErr {
        MlErr::SizeMismatch {
            what: "dense layer shape",
            got: self.size,
            expected: (self.dim.0 + 1) * self.dim.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn forward_computes_the_affine_map() {
        let mut dense = Dense::new((2, 1), None);
        let params = [1.0, 2.0, 0.5];

        let y = dense.forward(&params, array![[1.0, 1.0], [2.0, 0.0]]).unwrap();
        assert_eq!(y, array![[3.5], [2.5]]);
    }

    #[test]
    fn backward_accumulates_scaled_gradients() {
        let mut dense = Dense::new((2, 1), None);
        let params = [0.0, 0.0, 0.0];
        let mut grad = [1.0, 1.0, 1.0];

        dense.forward(&params, array![[1.0, 2.0]]).unwrap();
        let d_in = dense
            .backward(&params, &mut grad, 0.5, array![[3.0]])
            .unwrap();

        assert_eq!(grad, [2.5, 4.0, 2.5]);
        assert_eq!(d_in, array![[0.0, 0.0]]);
    }

    #[test]
    fn backward_without_forward_fails() {
        let mut dense = Dense::new((1, 1), None);
        let mut grad = [0.0; 2];
        let err = dense
            .backward(&[0.0; 2], &mut grad, 1.0, array![[1.0]])
            .unwrap_err();

        assert!(matches!(err, MlErr::MissingForwardPass { .. }));
    }

    #[test]
    fn wrong_parameter_count_is_rejected() {
        let mut dense = Dense::new((2, 2), Some(ActFn::sigmoid(1.0)));
        let err = dense.forward(&[0.0; 5], array![[1.0, 1.0]]).unwrap_err();

        assert_eq!(
            err,
            MlErr::SizeMismatch {
                what: "params",
                got: 5,
                expected: 6
            }
        );
    }

    #[test]
    fn init_params_zeroes_the_biases() {
        let dense = Dense::new((3, 2), None);
        let mut params = vec![9.0; dense.size()];
        dense
            .init_params(&mut params, &mut StdRng::seed_from_u64(7))
            .unwrap();

        let limit = (6.0_f32 / 5.0).sqrt();
        assert!(params[..6].iter().all(|w| w.abs() <= limit));
        assert_eq!(params[6..], [0.0, 0.0]);
    }
}
