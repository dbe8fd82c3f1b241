use super::genes::perturbed;
use crate::genomics::{ConnectionGene, GeneticConfig};
use crate::Innovation;

use ahash::RandomState;
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::collections::HashSet;
use std::fmt;

/// An ActivationType represents the type
/// of activation function the node's network
/// equivalent will use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationType {
    Sigmoid,
    Identity,
    ReLU,
    Tanh,
    Gaussian,
    Sinusoidal,
}

impl ActivationType {
    /// Applies the activation function to `input_sum`.
    ///
    /// Sigmoid uses the steepened `1 / (1 + e^(-4.9x))` curve
    /// from the 2002 paper.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::ActivationType;
    ///
    /// assert_eq!(ActivationType::Sigmoid.apply(0.0), 0.5);
    /// assert_eq!(ActivationType::ReLU.apply(-3.0), 0.0);
    /// assert_eq!(ActivationType::Identity.apply(-3.0), -3.0);
    /// ```
    pub fn apply(self, input_sum: f32) -> f32 {
        match self {
            ActivationType::Sigmoid => 1.0 / (1.0 + (-4.9 * input_sum).exp()),
            ActivationType::Identity => input_sum,
            ActivationType::ReLU => input_sum.max(0.0),
            ActivationType::Tanh => input_sum.tanh(),
            ActivationType::Gaussian => (-input_sum.powf(2.0)).exp(),
            ActivationType::Sinusoidal => (input_sum * std::f32::consts::PI).sin(),
        }
    }
}

/// A NodeType indicates the role of
/// the node in the genome's network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Input nodes. Never the target of a connection.
    Input,
    /// Hidden nodes, created by node addition mutations.
    Hidden,
    /// Output nodes.
    Output,
}

/// Nodes are the structural elements of genomes
/// between which connections are created.
///
/// Nodes are never removed from a genome, and only
/// their activation type and bias may change after creation.
/// The bias is added to the node's input sum before activation;
/// it has no effect on input nodes.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NodeGene {
    id: Innovation,
    inputs: HashSet<Innovation, RandomState>,
    outputs: HashSet<Innovation, RandomState>,
    node_type: NodeType,
    activation_type: ActivationType,
    bias: f32,
}

impl NodeGene {
    /// Generate a new node with the passed parameters,
    /// and a bias of 0.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{ActivationType, NodeGene, NodeType};
    ///
    /// let node = NodeGene::new(5, NodeType::Hidden, ActivationType::Sigmoid);
    /// assert_eq!(node.id(), 5);
    /// assert_eq!(node.bias(), 0.0);
    /// ```
    pub fn new(id: Innovation, node_type: NodeType, activation_type: ActivationType) -> NodeGene {
        NodeGene {
            id,
            inputs: HashSet::default(),
            outputs: HashSet::default(),
            node_type,
            activation_type,
            bias: 0.0,
        }
    }

    /// Records `connection` as one of the node's incoming connections.
    ///
    /// # Panics
    /// This function panics if the connection is already
    /// in the node's inputs.
    pub(crate) fn add_input_connection(&mut self, connection: Innovation) {
        if !self.inputs.insert(connection) {
            panic!("attempted to add duplicate input with ID {}", connection)
        }
    }

    /// Records `connection` as one of the node's outgoing connections.
    ///
    /// # Panics
    /// This function panics if the connection is already
    /// in the node's outputs.
    pub(crate) fn add_output_connection(&mut self, connection: Innovation) {
        if !self.outputs.insert(connection) {
            panic!("attempted to add duplicate output with ID {}", connection)
        }
    }

    /// Returns the node's id.
    pub fn id(&self) -> Innovation {
        self.id
    }

    /// Returns an iterator over the markers of the node's incoming connections.
    pub fn input_connections(&self) -> impl Iterator<Item = &Innovation> {
        self.inputs.iter()
    }

    /// Returns an iterator over the markers of the node's outgoing connections.
    pub fn output_connections(&self) -> impl Iterator<Item = &Innovation> {
        self.outputs.iter()
    }

    /// Returns the node's role.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Returns the node's activation type.
    pub fn activation_type(&self) -> ActivationType {
        self.activation_type
    }

    /// Sets the node's activation type.
    pub fn set_activation_type(&mut self, activation_type: ActivationType) {
        self.activation_type = activation_type;
    }

    /// Returns the node's bias.
    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Sets the node's bias.
    pub fn set_bias(&mut self, bias: f32) {
        self.bias = bias;
    }

    /// Replaces the node's bias with a fresh random value
    /// in ±[`weight_init_range`].
    ///
    /// [`weight_init_range`]: GeneticConfig::weight_init_range
    pub fn randomize_bias(&mut self, rng: &mut impl Rng, config: &GeneticConfig) {
        self.bias = ConnectionGene::random_weight(rng, config);
    }

    /// Perturbs the node's bias the way connection weights
    /// are perturbed, clamping it to ±[`weight_bound`].
    ///
    /// [`weight_bound`]: GeneticConfig::weight_bound
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{ActivationType, GeneticConfig, NodeGene, NodeType};
    ///
    /// let config = GeneticConfig {
    ///     weight_perturb_power: 0.5,
    ///     weight_bound: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut node = NodeGene::new(2, NodeType::Output, ActivationType::Sigmoid);
    /// node.set_bias(0.9);
    /// node.perturb_bias(&mut rand::thread_rng(), &config);
    ///
    /// assert!(node.bias().abs() <= 1.0);
    /// ```
    pub fn perturb_bias(&mut self, rng: &mut impl Rng, config: &GeneticConfig) {
        self.bias = perturbed(self.bias, rng, config);
    }
}

impl fmt::Display for NodeGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}[{:?}, {:?}, BIAS: {:.4}, IN: {:?}, OUT: {:?}]",
            self.id, self.node_type, self.activation_type, self.bias, self.inputs, self.outputs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic]
    fn duplicate_input_connection() {
        let mut node = NodeGene::new(5, NodeType::Hidden, ActivationType::Sigmoid);
        node.add_input_connection(9);
        node.add_input_connection(9);
    }

    #[test]
    fn activation_functions() {
        assert_eq!(ActivationType::Gaussian.apply(0.0), 1.0);
        assert_eq!(ActivationType::Tanh.apply(0.0), 0.0);
        assert!(ActivationType::Sigmoid.apply(10.0) > 0.99);
        assert!(ActivationType::Sinusoidal.apply(0.5) > 0.99);
    }
}
