use log::trace;
use ndarray::{Array2, ArrayView2};

use super::{Objective, ObjectiveType};
use crate::error::{Result, TrainErr};

/// Computes a supervision-free regularizer over `output`.
///
/// # Arguments
/// * `objective_type` - The objective of the *primary* output the regularizer belongs to.
/// * `output_name` - The regularizer node's name, for diagnostics.
/// * `output` - The regularizer node's output.
/// * `supply_deriv` - Whether to also compute the derivative with respect to `output`.
///
/// # Returns
/// The total weight and objective, or an error for objectives that have no regularizer.
pub fn compute_regularizer(
    objective_type: ObjectiveType,
    output_name: &str,
    output: ArrayView2<f32>,
    supply_deriv: bool,
) -> Result<Objective> {
    trace!(node = output_name; "regularizer output: {output}");

    let tot_weight = output.nrows() as f32;

    match objective_type {
        ObjectiveType::Linear => {
            // objective is x
            let tot_objf = output.iter().map(|&x| f64::from(x)).sum::<f64>();

            Ok(Objective {
                tot_weight,
                tot_objf: tot_objf as f32,
                deriv: supply_deriv.then(|| Array2::ones(output.raw_dim())),
            })
        }
        ObjectiveType::Quadratic => {
            // objective is -0.5 x^2, the derivative is handed back unscaled
            let tot_objf = output.iter().map(|&x| f64::from(x * x)).sum::<f64>();

            Ok(Objective {
                tot_weight,
                tot_objf: (-0.5 * tot_objf) as f32,
                deriv: supply_deriv.then(|| output.to_owned()),
            })
        }
        ObjectiveType::CrossEntropy => Err(TrainErr::UnsupportedRegularizer {
            output: output_name.to_string(),
            objective: objective_type,
        }),
    }
}
