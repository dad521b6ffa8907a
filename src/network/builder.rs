use std::collections::HashSet;

use machine_learning::arch::{layers::Dense, Sequential};

use super::{ActivationStats, Network, Node, OutputNode};
use crate::{
    error::{Result, TrainErr},
    objective::ObjectiveType,
};

enum PendingNode {
    Input {
        dim: usize,
    },
    Output {
        input: String,
        layers: Vec<Dense>,
        objective: ObjectiveType,
    },
}

/// Builds a `Network` node by node. Nodes keep the order they were added in, and so do the
/// parameter ranges of the outputs.
pub struct NetworkBuilder {
    nodes: Vec<(String, PendingNode)>,
    learning_rate: f32,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkBuilder {
    /// Creates a new `NetworkBuilder` with no nodes and a learning rate of 1.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            learning_rate: 1.0,
        }
    }

    /// Adds an input node taking `dim` features per row.
    pub fn input<S: Into<String>>(mut self, name: S, dim: usize) -> Self {
        self.nodes.push((name.into(), PendingNode::Input { dim }));
        self
    }

    /// Adds an output node.
    ///
    /// # Arguments
    /// * `name` - The output's name.
    /// * `input` - The name of the input node the output is computed from.
    /// * `layers` - The feed-forward stack from the input to the output.
    /// * `objective` - The objective the output is trained with.
    pub fn output<S, T, I>(mut self, name: S, input: T, layers: I, objective: ObjectiveType) -> Self
    where
        S: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = Dense>,
    {
        self.nodes.push((
            name.into(),
            PendingNode::Output {
                input: input.into(),
                layers: layers.into_iter().collect(),
                objective,
            },
        ));
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Builds the network, every parameter set to zero.
    ///
    /// # Returns
    /// The network, or an `InvalidNetwork` error if names repeat, an output refers to a missing
    /// input or its layers don't fit the input's dimension.
    pub fn build(self) -> Result<Network> {
        if !self.learning_rate.is_finite() {
            return Err(TrainErr::InvalidNetwork(format!(
                "learning rate must be finite, got {}",
                self.learning_rate
            )));
        }

        let mut seen = HashSet::new();
        if let Some((name, _)) = self.nodes.iter().find(|(name, _)| !seen.insert(name)) {
            return Err(TrainErr::InvalidNetwork(format!("duplicate node name '{name}'")));
        }

        let input_dim = |input: &str| {
            self.nodes.iter().position(|(name, _)| name == input).and_then(|i| {
                match self.nodes[i].1 {
                    PendingNode::Input { dim } => Some((i, dim)),
                    PendingNode::Output { .. } => None,
                }
            })
        };

        let mut names = Vec::with_capacity(self.nodes.len());
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut offset = 0;

        for (name, pending) in &self.nodes {
            let node = match pending {
                PendingNode::Input { dim } => Node::Input { dim: *dim },
                PendingNode::Output {
                    input,
                    layers,
                    objective,
                } => {
                    let (input, dim) = input_dim(input).ok_or_else(|| {
                        TrainErr::InvalidNetwork(format!(
                            "output '{name}' reads from '{input}', which is not an input node"
                        ))
                    })?;

                    let model = Sequential::new(layers.iter().cloned())?;
                    let (Some(in_dim), Some(out_dim)) = (model.input_dim(), model.output_dim())
                    else {
                        return Err(TrainErr::InvalidNetwork(format!(
                            "output '{name}' has no layers"
                        )));
                    };

                    if in_dim != dim {
                        return Err(TrainErr::InvalidNetwork(format!(
                            "output '{name}' expects {in_dim} features but '{}' has {dim}",
                            self.nodes[input].0
                        )));
                    }

                    let output = OutputNode {
                        input,
                        offset,
                        objective: *objective,
                        stats: ActivationStats::new(out_dim),
                        model,
                    };
                    offset += output.model.size();
                    Node::Output(output)
                }
            };

            names.push(name.clone());
            nodes.push(node);
        }

        Ok(Network::new(names, nodes, self.learning_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err_message(builder: NetworkBuilder) -> String {
        match builder.build() {
            Err(TrainErr::InvalidNetwork(msg)) => msg,
            other => panic!("expected an invalid network, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let builder = NetworkBuilder::new().input("input", 2).input("input", 3);
        assert!(err_message(builder).contains("duplicate node name 'input'"));
    }

    #[test]
    fn outputs_must_read_from_an_input() {
        let builder = NetworkBuilder::new().input("input", 2).output(
            "output",
            "features",
            [Dense::new((2, 1), None)],
            ObjectiveType::Linear,
        );
        assert!(err_message(builder).contains("'features'"));
    }

    #[test]
    fn outputs_need_layers() {
        let builder = NetworkBuilder::new()
            .input("input", 2)
            .output("output", "input", Vec::new(), ObjectiveType::Linear);
        assert!(err_message(builder).contains("no layers"));
    }

    #[test]
    fn first_layer_must_fit_the_input() {
        let builder = NetworkBuilder::new().input("input", 2).output(
            "output",
            "input",
            [Dense::new((3, 1), None)],
            ObjectiveType::Linear,
        );
        assert!(err_message(builder).contains("expects 3 features"));
    }

    #[test]
    fn mismatched_layers_are_a_model_error() {
        let err = NetworkBuilder::new()
            .input("input", 2)
            .output(
                "output",
                "input",
                [Dense::new((2, 3), None), Dense::new((2, 1), None)],
                ObjectiveType::Linear,
            )
            .build()
            .unwrap_err();

        assert!(matches!(err, TrainErr::Ml(_)));
    }

    #[test]
    fn learning_rate_is_kept() {
        let network = NetworkBuilder::new()
            .input("input", 1)
            .learning_rate(0.25)
            .build()
            .unwrap();

        assert_eq!(network.learning_rate(), 0.25);
        assert_eq!(network.num_params(), 0);
    }
}
