mod builder;
mod compiler;
mod computer;

use std::ops::Range;

use machine_learning::arch::Sequential;
use ndarray::{Array1, ArrayView2, Axis};
use rand::Rng;

use crate::{error::Result, nnet::Nnet, objective::ObjectiveType};

pub use builder::NetworkBuilder;
pub use compiler::{NetworkCompiler, NetworkComputation};
pub use computer::NetworkComputer;

/// The activation statistics of an output node, accumulated over forward passes.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationStats {
    /// Per column sum of the node's output.
    pub value_sum: Array1<f32>,
    /// The amount of rows summed.
    pub count: usize,
}

impl ActivationStats {
    fn new(dim: usize) -> Self {
        Self {
            value_sum: Array1::zeros(dim),
            count: 0,
        }
    }

    fn add(&mut self, value: ArrayView2<f32>) {
        self.value_sum += &value.sum_axis(Axis(0));
        self.count += value.nrows();
    }

    fn clear(&mut self) {
        self.value_sum.fill(0.);
        self.count = 0;
    }

    /// The mean activation of every column, `None` before any forward pass.
    pub fn mean(&self) -> Option<Array1<f32>> {
        (self.count > 0).then(|| &self.value_sum / self.count as f32)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OutputNode {
    /// Index of the input node this output is computed from.
    pub(crate) input: usize,
    pub(crate) model: Sequential,
    pub(crate) objective: ObjectiveType,
    pub(crate) offset: usize,
    pub(crate) stats: ActivationStats,
}

impl OutputNode {
    /// This node's range within the network's flat parameters.
    pub(crate) fn param_range(&self) -> Range<usize> {
        self.offset..self.offset + self.model.size()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Input { dim: usize },
    Output(OutputNode),
}

/// A network of named input nodes and output nodes, every output a feed-forward stack over one
/// of the inputs. All the stacks share a single flat parameter vector.
#[derive(Debug, Clone)]
pub struct Network {
    names: Vec<String>,
    nodes: Vec<Node>,
    params: Vec<f32>,
    learning_rate: f32,
}

impl Network {
    pub(crate) fn new(names: Vec<String>, nodes: Vec<Node>, learning_rate: f32) -> Self {
        let size = nodes
            .iter()
            .map(|node| match node {
                Node::Input { .. } => 0,
                Node::Output(output) => output.model.size(),
            })
            .sum();

        Self {
            names,
            nodes,
            params: vec![0.; size],
            learning_rate,
        }
    }

    /// Randomizes the weights of every output stack, biases are set to zero.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    pub fn randomize_params<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        for node in &self.nodes {
            if let Node::Output(output) = node {
                output
                    .model
                    .init_params(&mut self.params[output.param_range()], rng)?;
            }
        }

        Ok(())
    }

    /// The factor every parameter derivative is multiplied by.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    /// The statistics stored for the output called `name`, `None` if there is no such output.
    pub fn activation_stats(&self, name: &str) -> Option<&ActivationStats> {
        match self.node_index(name).map(|node| &self.nodes[node]) {
            Some(Node::Output(output)) => Some(&output.stats),
            _ => None,
        }
    }

    pub(crate) fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    pub(crate) fn node(&self, node: usize) -> &Node {
        &self.nodes[node]
    }

    pub(crate) fn node_mut(&mut self, node: usize) -> &mut Node {
        &mut self.nodes[node]
    }
}

impl Nnet for Network {
    fn node_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn is_input_node(&self, node: usize) -> bool {
        matches!(self.nodes.get(node), Some(Node::Input { .. }))
    }

    fn is_output_node(&self, node: usize) -> bool {
        matches!(self.nodes.get(node), Some(Node::Output(_)))
    }

    fn objective_type(&self, node: usize) -> Option<ObjectiveType> {
        match self.nodes.get(node) {
            Some(Node::Output(output)) => Some(output.objective),
            _ => None,
        }
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    fn zero_component_stats(&mut self) {
        for node in self.nodes.iter_mut() {
            if let Node::Output(output) = node {
                output.stats.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::arch::layers::Dense;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn network() -> Network {
        NetworkBuilder::new()
            .input("input", 3)
            .output("output", "input", [Dense::new((3, 2), None)], ObjectiveType::Quadratic)
            .output("aux", "input", [Dense::new((3, 1), None)], ObjectiveType::Linear)
            .build()
            .unwrap()
    }

    #[test]
    fn outputs_own_consecutive_parameter_ranges() {
        let network = network();
        assert_eq!(network.num_params(), 8 + 4);

        let ranges: Vec<_> = network
            .nodes
            .iter()
            .filter_map(|node| match node {
                Node::Output(output) => Some(output.param_range()),
                Node::Input { .. } => None,
            })
            .collect();
        assert_eq!(ranges, [0..8, 8..12]);
    }

    #[test]
    fn node_roles_and_objectives() {
        let network = network();
        let input = network.node_index("input").unwrap();
        let output = network.node_index("output").unwrap();

        assert!(network.is_input_node(input));
        assert!(!network.is_output_node(input));
        assert!(network.is_output_node(output));
        assert_eq!(network.objective_type(output), Some(ObjectiveType::Quadratic));
        assert_eq!(network.objective_type(input), None);
        assert_eq!(network.node_index("missing"), None);
    }

    #[test]
    fn parameters_start_at_zero_and_can_be_randomized() {
        let mut network = network();
        assert!(network.params().iter().all(|&p| p == 0.0));

        network
            .randomize_params(&mut StdRng::seed_from_u64(42))
            .unwrap();
        assert!(network.params()[..6].iter().any(|&p| p != 0.0));
        // biases stay at zero
        assert_eq!(network.params()[6..8], [0.0, 0.0]);
    }

    #[test]
    fn activation_stats_accumulate_and_clear() {
        let mut network = network();
        let output = network.node_index("output").unwrap();

        if let Node::Output(node) = network.node_mut(output) {
            node.stats.add(array![[1.0, 2.0], [3.0, 4.0]].view());
        }

        let stats = network.activation_stats("output").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean(), Some(array![2.0, 3.0]));

        network.zero_component_stats();
        let stats = network.activation_stats("output").unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean(), None);
        assert!(network.activation_stats("input").is_none());
    }
}
