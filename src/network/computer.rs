use std::rc::Rc;

use machine_learning::{arch::Sequential, MlErr};
use ndarray::{Array2, ArrayView2};

use super::{Network, NetworkComputation, Node, OutputNode};
use crate::{
    error::{Result, TrainErr},
    nnet::{Computer, Nnet, NnetIo},
};

/// What the forward pass leaves behind for an output.
struct OutputValue {
    /// A copy of the output's stack holding its forward metadata.
    model: Sequential,
    value: Array2<f32>,
    deriv: Option<Array2<f32>>,
}

/// Executes a `NetworkComputation`: inputs go in, the forward pass fills the outputs, the
/// derivatives of the outputs come back and the backward pass turns them into parameter
/// derivatives.
pub struct NetworkComputer {
    computation: Rc<NetworkComputation>,
    inputs: Vec<Option<Array2<f32>>>,
    outputs: Vec<Option<OutputValue>>,
}

impl NetworkComputer {
    pub(crate) fn new(computation: Rc<NetworkComputation>) -> Self {
        let inputs = computation.inputs.iter().map(|_| None).collect();
        let outputs = computation.outputs.iter().map(|_| None).collect();

        Self {
            computation,
            inputs,
            outputs,
        }
    }

    fn output_position(&self, name: &str) -> Result<usize> {
        self.computation
            .outputs
            .iter()
            .position(|output| output.spec.name == name)
            .ok_or_else(|| TrainErr::MissingOutput(name.to_string()))
    }
}

fn output_node(nnet: &Network, node: usize) -> Result<&OutputNode> {
    match nnet.node(node) {
        Node::Output(output) => Ok(output),
        Node::Input { .. } => Err(TrainErr::NotAnOutput(nnet.name(node).to_string())),
    }
}

impl Computer<Network> for NetworkComputer {
    fn accept_inputs(&mut self, nnet: &Network, io: &[NnetIo]) -> Result<()> {
        for (slot, input) in self.inputs.iter_mut().zip(&self.computation.inputs) {
            let name = &input.spec.name;
            let io = io
                .iter()
                .find(|io| &io.name == name)
                .ok_or_else(|| TrainErr::MissingInput(name.clone()))?;

            let Node::Input { dim } = *nnet.node(input.node) else {
                return Err(TrainErr::NotAnInput(name.clone()));
            };

            let features = io.features.to_dense().into_owned();
            if features.ncols() != dim {
                return Err(TrainErr::DimensionMismatch {
                    output: name.clone(),
                    what: "input dimension",
                    nnet: dim,
                    egs: features.ncols(),
                });
            }

            if features.nrows() != input.spec.num_rows {
                return Err(TrainErr::DimensionMismatch {
                    output: name.clone(),
                    what: "number of frames",
                    nnet: input.spec.num_rows,
                    egs: features.nrows(),
                });
            }

            *slot = Some(features);
        }

        Ok(())
    }

    fn forward(&mut self, nnet: &Network) -> Result<()> {
        for (i, output) in self.computation.outputs.iter().enumerate() {
            let input = &self.computation.inputs[output.input];
            let x = self.inputs[output.input]
                .clone()
                .ok_or_else(|| TrainErr::MissingInput(input.spec.name.clone()))?;

            let node = output_node(nnet, output.node)?;
            let mut model = node.model.clone();
            let value = model.forward(&nnet.params()[node.param_range()], x)?;

            self.outputs[i] = Some(OutputValue {
                model,
                value,
                deriv: None,
            });
        }

        Ok(())
    }

    fn store_component_stats(&self, nnet: &mut Network) {
        if !self.computation.store_component_stats {
            return;
        }

        for (spec, output) in self.computation.outputs.iter().zip(&self.outputs) {
            if let (Node::Output(node), Some(output)) = (nnet.node_mut(spec.node), output) {
                node.stats.add(output.value.view());
            }
        }
    }

    fn output(&self, name: &str) -> Result<ArrayView2<'_, f32>> {
        let i = self.output_position(name)?;
        self.outputs[i]
            .as_ref()
            .map(|output| output.value.view())
            .ok_or_else(|| TrainErr::MissingOutput(name.to_string()))
    }

    fn accept_output_deriv(&mut self, name: &str, deriv: Array2<f32>) -> Result<()> {
        let i = self.output_position(name)?;
        if !self.computation.outputs[i].spec.has_deriv {
            return Err(TrainErr::UnexpectedOutputDeriv(name.to_string()));
        }

        let output = self.outputs[i]
            .as_mut()
            .ok_or_else(|| TrainErr::MissingOutput(name.to_string()))?;

        if deriv.dim() != output.value.dim() {
            return Err(TrainErr::DimensionMismatch {
                output: name.to_string(),
                what: "output derivative size",
                nnet: output.value.len(),
                egs: deriv.len(),
            });
        }

        output.deriv = Some(deriv);
        Ok(())
    }

    fn backward(&mut self, nnet: &Network, grad: &mut [f32]) -> Result<()> {
        if !self.computation.need_model_derivative {
            return Ok(());
        }

        if grad.len() != nnet.num_params() {
            return Err(MlErr::SizeMismatch {
                what: "grad",
                got: grad.len(),
                expected: nnet.num_params(),
            }
            .into());
        }

        for (spec, output) in self.computation.outputs.iter().zip(self.outputs.iter_mut()) {
            if !spec.spec.has_deriv {
                continue;
            }

            let name = &spec.spec.name;
            let output = output
                .as_mut()
                .ok_or_else(|| TrainErr::MissingOutput(name.clone()))?;
            let deriv = output
                .deriv
                .take()
                .ok_or_else(|| TrainErr::MissingOutputDeriv(name.clone()))?;

            let range = output_node(nnet, spec.node)?.param_range();
            output.model.backward(
                &nnet.params()[range.clone()],
                &mut grad[range],
                nnet.learning_rate(),
                deriv,
            )?;
        }

        Ok(())
    }
}
