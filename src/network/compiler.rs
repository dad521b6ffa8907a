use std::{collections::HashMap, rc::Rc};

use log::debug;

use super::{Network, NetworkComputer, Node};
use crate::{
    error::{Result, TrainErr},
    nnet::{Compiler, ComputationRequest, IoSpecification, Nnet},
};

/// An input the computation reads from the example.
#[derive(Debug)]
pub(crate) struct ComputationInput {
    pub(crate) node: usize,
    pub(crate) spec: IoSpecification,
}

/// An output the computation evaluates.
#[derive(Debug)]
pub(crate) struct ComputationOutput {
    pub(crate) node: usize,
    /// Position of this output's source within the computation inputs.
    pub(crate) input: usize,
    pub(crate) spec: IoSpecification,
}

/// A request resolved against a network's topology.
#[derive(Debug)]
pub struct NetworkComputation {
    pub(crate) inputs: Vec<ComputationInput>,
    pub(crate) outputs: Vec<ComputationOutput>,
    pub(crate) need_model_derivative: bool,
    pub(crate) store_component_stats: bool,
}

impl NetworkComputation {
    fn new(nnet: &Network, request: &ComputationRequest) -> Result<Self> {
        let mut inputs = Vec::with_capacity(request.inputs.len());
        for spec in &request.inputs {
            let node = nnet
                .node_index(&spec.name)
                .ok_or_else(|| TrainErr::UnknownNode(spec.name.clone()))?;

            if !nnet.is_input_node(node) {
                return Err(TrainErr::NotAnInput(spec.name.clone()));
            }

            inputs.push(ComputationInput {
                node,
                spec: spec.clone(),
            });
        }

        let mut outputs = Vec::with_capacity(request.outputs.len());
        for spec in &request.outputs {
            let node = nnet
                .node_index(&spec.name)
                .ok_or_else(|| TrainErr::UnknownNode(spec.name.clone()))?;

            let Node::Output(output) = nnet.node(node) else {
                return Err(TrainErr::NotAnOutput(spec.name.clone()));
            };

            let input = inputs
                .iter()
                .position(|input| input.node == output.input)
                .ok_or_else(|| TrainErr::MissingInput(nnet.name(output.input).to_string()))?;

            let num_rows = inputs[input].spec.num_rows;
            if spec.num_rows != num_rows {
                return Err(TrainErr::DimensionMismatch {
                    output: spec.name.clone(),
                    what: "number of frames",
                    nnet: num_rows,
                    egs: spec.num_rows,
                });
            }

            outputs.push(ComputationOutput {
                node,
                input,
                spec: spec.clone(),
            });
        }

        Ok(Self {
            inputs,
            outputs,
            need_model_derivative: request.need_model_derivative,
            store_component_stats: request.store_component_stats,
        })
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }
}

/// Compiles computation requests for a `Network`, every request is compiled once.
#[derive(Debug, Default)]
pub struct NetworkCompiler {
    cache: HashMap<ComputationRequest, Rc<NetworkComputation>>,
}

impl NetworkCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The amount of distinct requests compiled so far.
    pub fn num_cached(&self) -> usize {
        self.cache.len()
    }
}

impl Compiler<Network> for NetworkCompiler {
    type Computation = NetworkComputation;
    type Computer = NetworkComputer;

    fn compile(
        &mut self,
        nnet: &Network,
        request: &ComputationRequest,
    ) -> Result<Rc<NetworkComputation>> {
        if let Some(computation) = self.cache.get(request) {
            return Ok(Rc::clone(computation));
        }

        let computation = Rc::new(NetworkComputation::new(nnet, request)?);
        debug!(
            inputs = computation.num_inputs(),
            outputs = computation.num_outputs();
            "compiled a new computation"
        );

        self.cache.insert(request.clone(), Rc::clone(&computation));
        Ok(computation)
    }

    fn computer(&self, computation: Rc<NetworkComputation>) -> NetworkComputer {
        NetworkComputer::new(computation)
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::arch::layers::Dense;

    use super::*;
    use crate::{network::NetworkBuilder, objective::ObjectiveType};

    fn network() -> Network {
        NetworkBuilder::new()
            .input("input", 2)
            .input("ivector", 4)
            .output("output", "input", [Dense::new((2, 1), None)], ObjectiveType::Quadratic)
            .build()
            .unwrap()
    }

    fn spec(name: &str, num_rows: usize, has_deriv: bool) -> IoSpecification {
        IoSpecification {
            name: name.to_string(),
            num_rows,
            has_deriv,
        }
    }

    fn request(inputs: Vec<IoSpecification>, outputs: Vec<IoSpecification>) -> ComputationRequest {
        ComputationRequest {
            inputs,
            outputs,
            need_model_derivative: true,
            store_component_stats: false,
        }
    }

    #[test]
    fn repeated_requests_hit_the_cache() {
        let network = network();
        let mut compiler = NetworkCompiler::new();
        let req = request(vec![spec("input", 3, false)], vec![spec("output", 3, true)]);

        let first = compiler.compile(&network, &req).unwrap();
        let second = compiler.compile(&network, &req).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(compiler.num_cached(), 1);

        let other = request(vec![spec("input", 5, false)], vec![spec("output", 5, true)]);
        compiler.compile(&network, &other).unwrap();
        assert_eq!(compiler.num_cached(), 2);
    }

    #[test]
    fn outputs_are_resolved_to_their_inputs() {
        let req = request(
            vec![spec("ivector", 3, false), spec("input", 3, false)],
            vec![spec("output", 3, true)],
        );
        let computation = NetworkComputation::new(&network(), &req).unwrap();

        assert_eq!(computation.num_inputs(), 2);
        assert_eq!(computation.outputs[0].input, 1);
    }

    #[test]
    fn roles_are_checked() {
        let network = network();

        let req = request(vec![spec("output", 3, false)], vec![]);
        let err = NetworkComputation::new(&network, &req).unwrap_err();
        assert!(matches!(err, TrainErr::NotAnInput(name) if name == "output"));

        let req = request(vec![spec("input", 3, false)], vec![spec("ivector", 3, true)]);
        let err = NetworkComputation::new(&network, &req).unwrap_err();
        assert!(matches!(err, TrainErr::NotAnOutput(name) if name == "ivector"));
    }

    #[test]
    fn outputs_need_their_input_supplied() {
        let req = request(vec![spec("ivector", 3, false)], vec![spec("output", 3, true)]);
        let err = NetworkComputation::new(&network(), &req).unwrap_err();
        assert!(matches!(err, TrainErr::MissingInput(name) if name == "input"));
    }

    #[test]
    fn output_rows_must_match_the_input() {
        let req = request(vec![spec("input", 3, false)], vec![spec("output", 4, true)]);
        let err = NetworkComputation::new(&network(), &req).unwrap_err();
        assert!(matches!(err, TrainErr::DimensionMismatch { nnet: 3, egs: 4, .. }));
    }
}
