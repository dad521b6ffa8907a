use machine_learning::matrix::GeneralMatrix;
use ndarray::{ArrayView2, Zip};

use super::{Objective, ObjectiveType};
use crate::error::{Result, TrainErr};

/// Computes the objective of `output` against `supervision`.
///
/// Whatever its encoding, the supervision is decoded to a dense matrix before any arithmetic, so
/// dense, sparse and compressed supervision with the same values give the same results.
///
/// # Arguments
/// * `supervision` - The example's targets, `x`.
/// * `objective_type` - The objective of the output node.
/// * `output_name` - The output node's name, for diagnostics.
/// * `output` - The network's output, `y`.
/// * `supply_deriv` - Whether to also compute the derivative with respect to `output`.
///
/// # Returns
/// The total weight and objective, or a `DimensionMismatch` error if the shapes differ.
pub fn compute_objective_function(
    supervision: &GeneralMatrix,
    objective_type: ObjectiveType,
    output_name: &str,
    output: ArrayView2<f32>,
    supply_deriv: bool,
) -> Result<Objective> {
    if output.ncols() != supervision.ncols() {
        return Err(TrainErr::DimensionMismatch {
            output: output_name.to_string(),
            what: "output dimension (num-classes)",
            nnet: output.ncols(),
            egs: supervision.ncols(),
        });
    }

    if output.nrows() != supervision.nrows() {
        return Err(TrainErr::DimensionMismatch {
            output: output_name.to_string(),
            what: "number of frames",
            nnet: output.nrows(),
            egs: supervision.nrows(),
        });
    }

    let post = supervision.to_dense();

    let objective = match objective_type {
        ObjectiveType::CrossEntropy => {
            // objective is x * log(y) + (1 - x) * log(1 - y)
            let tot_objf = Zip::from(post.view()).and(output).fold(0.0_f64, |acc, &x, &y| {
                acc + f64::from(x * y.ln() + (1. - x) * (1. - y).ln())
            });

            let deriv = supply_deriv.then(|| {
                Zip::from(post.view())
                    .and(output)
                    .map_collect(|&x, &y| x / y - (1. - x) / (1. - y))
            });

            Objective {
                tot_weight: post.len() as f32,
                tot_objf: tot_objf as f32,
                deriv,
            }
        }
        ObjectiveType::Linear => {
            // objective is x * y
            let tot_weight = post.iter().map(|&x| f64::from(x)).sum::<f64>();
            let tot_objf = Zip::from(post.view())
                .and(output)
                .fold(0.0_f64, |acc, &x, &y| acc + f64::from(x * y));

            Objective {
                tot_weight: tot_weight as f32,
                tot_objf: tot_objf as f32,
                deriv: supply_deriv.then(|| post.into_owned()),
            }
        }
        ObjectiveType::Quadratic => {
            // objective is -0.5 (x - y)^2
            let diff = &*post - &output;
            let tot_objf = diff.iter().map(|&d| f64::from(d * d)).sum::<f64>();

            Objective {
                tot_weight: diff.nrows() as f32,
                tot_objf: (-0.5 * tot_objf) as f32,
                deriv: supply_deriv.then_some(diff),
            }
        }
    };

    Ok(objective)
}
