use machine_learning::MlErr;
use rayon::prelude::*;

use super::Nnet;
use crate::error::Result;

fn check_sizes(what: &'static str, got: &[f32], expected: &[f32]) -> Result<()> {
    if got.len() != expected.len() {
        return Err(MlErr::SizeMismatch {
            what,
            got: got.len(),
            expected: expected.len(),
        }
        .into());
    }

    Ok(())
}

/// Sets every parameter of `nnet` to zero.
pub fn set_zero<N: Nnet>(nnet: &mut N) {
    nnet.params_mut().par_iter_mut().for_each(|p| *p = 0.);
}

/// Multiplies every parameter of `nnet` by `scale`.
pub fn scale_nnet<N: Nnet>(scale: f32, nnet: &mut N) {
    nnet.params_mut().par_iter_mut().for_each(|p| *p *= scale);
}

/// Does `dst += alpha * src`.
///
/// # Errors
/// `SizeMismatch` if the models have a different amount of parameters, `dst` is left untouched.
pub fn add_nnet<N: Nnet>(src: &N, alpha: f32, dst: &mut N) -> Result<()> {
    let src = src.params();
    let dst = dst.params_mut();
    check_sizes("added model", src, dst)?;

    dst.par_iter_mut()
        .zip(src)
        .for_each(|(d, &s)| *d += alpha * s);

    Ok(())
}

/// The dot product of the parameters of two models, accumulated in double precision.
pub fn dot_product<N: Nnet>(a: &N, b: &N) -> Result<f64> {
    let (a, b) = (a.params(), b.params());
    check_sizes("dot product operand", b, a)?;

    Ok(a.par_iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::TrainErr, nnet::tests::FlatNnet};

    #[test]
    fn set_zero_and_scale() {
        let mut nnet = FlatNnet(vec![1.0, -2.0, 3.0]);

        scale_nnet(0.5, &mut nnet);
        assert_eq!(nnet.0, [0.5, -1.0, 1.5]);

        set_zero(&mut nnet);
        assert_eq!(nnet.0, [0.0; 3]);
    }

    #[test]
    fn add_nnet_scales_the_source() {
        let src = FlatNnet(vec![1.0, 2.0]);
        let mut dst = FlatNnet(vec![10.0, 20.0]);

        add_nnet(&src, -2.0, &mut dst).unwrap();
        assert_eq!(dst.0, [8.0, 16.0]);
        assert_eq!(src.0, [1.0, 2.0]);
    }

    #[test]
    fn dot_product_of_a_model_with_itself_is_its_squared_norm() {
        let nnet = FlatNnet(vec![3.0, 4.0]);
        assert_eq!(dot_product(&nnet, &nnet).unwrap(), 25.0);
    }

    #[test]
    fn mismatched_models_are_an_error() {
        let mut dst = FlatNnet(vec![1.0, 2.0]);
        let err = add_nnet(&FlatNnet(vec![1.0]), 1.0, &mut dst).unwrap_err();
        assert!(matches!(
            err,
            TrainErr::Ml(MlErr::SizeMismatch {
                got: 1,
                expected: 2,
                ..
            })
        ));
        assert_eq!(dst.0, [1.0, 2.0]);

        assert!(dot_product(&FlatNnet(vec![1.0; 3]), &FlatNnet(vec![1.0])).is_err());
    }
}
