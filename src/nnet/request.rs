use super::{Nnet, NnetExample};
use crate::error::{Result, TrainErr};

/// An input or output a computation must serve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IoSpecification {
    pub name: String,
    pub num_rows: usize,
    /// Whether a derivative will be supplied for this output.
    pub has_deriv: bool,
}

/// Everything a compiler needs to know to build a computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComputationRequest {
    pub inputs: Vec<IoSpecification>,
    pub outputs: Vec<IoSpecification>,
    pub need_model_derivative: bool,
    pub store_component_stats: bool,
}

/// Builds the computation request for training on `eg`.
///
/// # Arguments
/// * `nnet` - The model the request is for.
/// * `eg` - The example, each of its entries must name an input or an output node.
/// * `need_model_derivative` - Whether the outputs will receive derivatives.
/// * `store_component_stats` - Whether the forward pass should store component statistics.
/// * `add_regularizer` - Whether to also request the `<output>-reg` node of every output.
///
/// # Returns
/// The request, or an error if the example doesn't fit the model's topology.
pub fn computation_request<N: Nnet>(
    nnet: &N,
    eg: &NnetExample,
    need_model_derivative: bool,
    store_component_stats: bool,
    add_regularizer: bool,
) -> Result<ComputationRequest> {
    let mut request = ComputationRequest {
        inputs: vec![],
        outputs: vec![],
        need_model_derivative,
        store_component_stats,
    };

    for io in &eg.io {
        let node = nnet
            .node_index(&io.name)
            .ok_or_else(|| TrainErr::UnknownNode(io.name.clone()))?;
        let num_rows = io.features.nrows();

        if nnet.is_input_node(node) {
            request.inputs.push(IoSpecification {
                name: io.name.clone(),
                num_rows,
                has_deriv: false,
            });
            continue;
        }

        if !nnet.is_output_node(node) {
            return Err(TrainErr::UnknownNode(io.name.clone()));
        }

        request.outputs.push(IoSpecification {
            name: io.name.clone(),
            num_rows,
            has_deriv: need_model_derivative,
        });

        if !add_regularizer {
            continue;
        }

        let reg_name = format!("{}-reg", io.name);
        if let Some(reg_node) = nnet.node_index(&reg_name) {
            if !nnet.is_output_node(reg_node) {
                return Err(TrainErr::NotAnOutput(reg_name));
            }

            request.outputs.push(IoSpecification {
                name: reg_name,
                num_rows,
                has_deriv: need_model_derivative,
            });
        }
    }

    Ok(request)
}
