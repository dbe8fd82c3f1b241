//! A Network is the phenotype of a Genome: disabled
//! connection genes are ignored, enabled ones become
//! weighted connections between network nodes.
//!
//! The `RecurrentNetwork` type is best suited for real-time
//! control tasks, with new inputs set for each activation,
//! and multiple time-steps involved. It tolerates cycles.
//!
//! For an instantaneous input-result use-case, the
//! `FeedForwardNetwork` type evaluates each node once,
//! layer by layer.
mod connection;
mod feed_forward;

pub use feed_forward::FeedForwardNetwork;

use crate::genomics::{ActivationType, Genome, NodeGene, NodeType};
use crate::Innovation;
use connection::Connection;

use ahash::RandomState;

use std::collections::HashMap;
use std::fmt;

/// An arbitrarily-structured neural network,
/// activated one time-step at a time.
#[derive(Clone, Debug)]
pub struct RecurrentNetwork {
    input_count: usize,
    output_count: usize,
    node_ids: Box<[Innovation]>,
    input_sums: Box<[f32]>,
    activation_levels: Box<[f32]>,
    activation_functions: Box<[ActivationType]>,
    biases: Box<[f32]>,
    connections: Box<[Box<[Connection]>]>,
}

impl RecurrentNetwork {
    /// Generates a new network from the passed genome.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::{
    ///     genomics::{GeneticConfig, Genome, InnovationRegistry},
    ///     networks::RecurrentNetwork,
    /// };
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_connections: 6,
    ///     ..GeneticConfig::default()
    /// };
    /// let mut registry = InnovationRegistry::new(3, 2);
    /// let genome = Genome::new(&mut rand::thread_rng(), &mut registry, &config);
    ///
    /// let network = RecurrentNetwork::new(&genome);
    /// assert_eq!(network.outputs().len(), 2);
    /// ```
    pub fn new(genome: &Genome) -> RecurrentNetwork {
        let nodes = ordered_nodes(genome);
        let node_ids: Vec<Innovation> = nodes.iter().map(|n| n.id()).collect();
        let total_node_count = node_ids.len();
        let node_index_from_id = index_map(&node_ids);
        let mut connections = vec![vec![]; total_node_count];

        for gene in genome.connections().filter(|c| c.enabled()) {
            let source_index = node_index_from_id[&gene.source()];
            let target_index = node_index_from_id[&gene.target()];
            connections[source_index].push(Connection::new(target_index, gene.weight()));
        }

        RecurrentNetwork {
            input_count: genome.input_count(),
            output_count: genome.output_count(),
            node_ids: node_ids.into(),
            input_sums: vec![0.0; total_node_count].into(),
            activation_levels: vec![0.0; total_node_count].into(),
            activation_functions: nodes.iter().map(|n| n.activation_type()).collect(),
            biases: nodes.iter().map(|n| n.bias()).collect(),
            connections: connections.into_iter().map(|v| v.into()).collect(),
        }
    }

    /// Fires all nodes, propagating all activations
    /// (including set inputs), and then computing
    /// new activation levels.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::{
    ///     genomics::{ActivationType, GeneticConfig, Genome},
    ///     networks::RecurrentNetwork,
    /// };
    /// use std::num::NonZeroUsize;
    ///
    /// let mut genome = Genome::unconnected(&GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_count: NonZeroUsize::new(1).unwrap(),
    ///     output_activation_types: vec![ActivationType::ReLU],
    ///     ..GeneticConfig::zero()
    /// });
    /// genome.add_connection(0, 0, 2, 2.5);
    /// genome.add_connection(1, 1, 2, -2.5);
    ///
    /// let mut network = RecurrentNetwork::new(&genome);
    /// network.set_inputs(&[0.5, 1.0]);
    ///
    /// network.activate();
    ///
    /// assert_eq!(network.outputs()[0], ((0.5 * 2.5 + 1.0 * (-2.5)) as f32).max(0.0));
    /// ```
    pub fn activate(&mut self) {
        self.fire_nodes();
        self.compute_activations();
    }

    /// Sets the inputs, activates once, and
    /// returns the outputs.
    ///
    /// # Panics
    /// Panics if the length of `inputs` is not
    /// equal to the number of inputs in the network.
    pub fn step(&mut self, inputs: &[f32]) -> Vec<f32> {
        self.set_inputs(inputs);
        self.activate();
        self.outputs()
    }

    fn fire_nodes(&mut self) {
        for (activation, outgoing) in self.activation_levels.iter().zip(self.connections.iter()) {
            for connection in outgoing.iter() {
                self.input_sums[connection.node] += *activation * connection.weight;
            }
        }
    }

    fn compute_activations(&mut self) {
        for (((input_sum, activation_level), activation_function), bias) in self.input_sums
            [self.input_count..]
            .iter_mut()
            .zip(&mut self.activation_levels[self.input_count..])
            .zip(&self.activation_functions[self.input_count..])
            .zip(&self.biases[self.input_count..])
        {
            *activation_level = activation_function.apply(*input_sum + bias);
            *input_sum = 0.0;
        }
    }

    /// Clears the activation state of all nodes.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::{
    ///     genomics::{GeneticConfig, Genome},
    ///     networks::RecurrentNetwork,
    /// };
    ///
    /// let mut genome = Genome::unconnected(&GeneticConfig::zero());
    /// genome.add_connection(0, 0, 1, 1.0);
    ///
    /// let mut network = RecurrentNetwork::new(&genome);
    /// network.set_inputs(&[1.0]);
    /// network.activate();
    /// assert_ne!(network.outputs()[0], 0.0);
    ///
    /// network.clear_state();
    ///
    /// assert_eq!(network.outputs()[0], 0.0);
    /// ```
    pub fn clear_state(&mut self) {
        for (input_sum, activation) in self
            .input_sums
            .iter_mut()
            .zip(self.activation_levels.iter_mut())
        {
            *input_sum = 0.0;
            *activation = 0.0;
        }
    }

    /// Sets the activation level of each input node
    /// to the corresponding value in the passed slice.
    ///
    /// # Panics
    /// This function panics if the length of the passed
    /// slice is not equal to the number of inputs in the network.
    pub fn set_inputs(&mut self, values: &[f32]) {
        self.activation_levels[..self.input_count].copy_from_slice(values);
    }

    /// Returns the current output node activation levels.
    pub fn outputs(&self) -> Vec<f32> {
        self.activation_levels[self.input_count..self.input_count + self.output_count].to_vec()
    }
}

impl fmt::Display for RecurrentNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self as &dyn fmt::Debug).fmt(f)
    }
}

/// Returns the genome's nodes ordered inputs first,
/// then outputs, then hidden nodes, each group sorted by id.
fn ordered_nodes(genome: &Genome) -> Vec<&NodeGene> {
    let mut nodes: Vec<&NodeGene> = genome.nodes().collect();
    nodes.sort_unstable_by_key(|n| {
        let rank = match n.node_type() {
            NodeType::Input => 0,
            NodeType::Output => 1,
            NodeType::Hidden => 2,
        };
        (rank, n.id())
    });
    nodes
}

fn index_map(node_ids: &[Innovation]) -> HashMap<Innovation, usize, RandomState> {
    node_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::GeneticConfig;
    use std::num::NonZeroUsize;

    fn sigmoid(x: f32) -> f32 {
        1.0 / (1.0 + (-4.9 * x).exp())
    }

    #[test]
    fn from_genome() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            output_activation_types: vec![ActivationType::Sigmoid, ActivationType::Gaussian],
            ..GeneticConfig::zero()
        };
        let mut genome = Genome::unconnected(&config);
        genome.add_node(4, ActivationType::Tanh);

        let markers = [0, 2, 6, 7, 3, 5, 4];
        let sources = [0, 0, 1, 3, 4, 4, 4];
        let targets = [2, 4, 4, 3, 3, 2, 4];
        let weights = [1.0, 1.0, 2.5, -2.0, -1.0, -1.5, 3.2];
        for i in 0..7 {
            genome.add_connection(markers[i], sources[i], targets[i], weights[i]);
        }
        // Disabled connections aren't expressed.
        genome.add_connection(1, 0, 3, -1.0).set_enabled(false);

        let network = RecurrentNetwork::new(&genome);
        assert_eq!(network.input_count, 2);
        assert_eq!(network.output_count, 2);
        assert_eq!(network.node_ids.len(), 5);
        assert_eq!(network.activation_functions[2], ActivationType::Sigmoid);
        assert_eq!(network.activation_functions[3], ActivationType::Gaussian);
        assert_eq!(network.activation_functions[4], ActivationType::Tanh);
        assert!(!network.connections[0].contains(&Connection::new(3, -1.0)));
        for node_index in 0..network.node_ids.len() {
            let (node_id, outgoing) = (network.node_ids[node_index], &network.connections[node_index]);
            for i in (0..7).filter(|i| sources[*i] == node_id) {
                let target_index = network.node_ids.iter().position(|id| *id == targets[i]).unwrap();
                assert!(outgoing.contains(&Connection::new(target_index, weights[i])));
            }
        }
    }

    #[test]
    fn activate_empty() {
        let genome = Genome::unconnected(&GeneticConfig::zero());
        let mut network = RecurrentNetwork::new(&genome);
        assert!((0..100).all(|_| {
            network.activate();
            network.outputs()[0] == sigmoid(0.0)
        }));
    }

    #[test]
    fn activate_single() {
        let mut genome = Genome::unconnected(&GeneticConfig::zero());
        genome.add_connection(0, 0, 1, 1.0);
        let mut network = RecurrentNetwork::new(&genome);
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            network.clear_state();
            assert_eq!(network.step(&[input])[0], sigmoid(input));
        }
    }

    #[test]
    fn activate_self_loop() {
        let mut genome = Genome::unconnected(&GeneticConfig::zero());
        genome.add_connection(0, 0, 1, 1.0);
        genome.add_connection(1, 1, 1, -1.0);
        let mut network = RecurrentNetwork::new(&genome);
        let mut previous_output = 0.0;
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            let output = network.step(&[input])[0];
            assert_eq!(output, sigmoid(input - previous_output));
            previous_output = output;
        }
    }

    #[test]
    fn activate_hidden() {
        let mut genome = Genome::unconnected(&GeneticConfig::zero());
        genome.add_node(2, ActivationType::Sigmoid);
        genome.add_connection(0, 0, 2, 1.0);
        genome.add_connection(1, 2, 1, 1.0);
        let mut network = RecurrentNetwork::new(&genome);
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            network.clear_state();
            network.set_inputs(&[input]);
            network.activate();
            network.activate();
            assert_eq!(network.outputs()[0], sigmoid(sigmoid(input)))
        }
    }

    #[test]
    fn activate_with_bias() {
        let mut genome = Genome::unconnected(&GeneticConfig::zero());
        genome.add_node(2, ActivationType::Identity).set_bias(0.5);
        genome.add_connection(0, 0, 2, 2.0);
        genome.add_connection(1, 2, 1, 1.0);
        let mut network = RecurrentNetwork::new(&genome);
        assert_eq!(network.biases[1], 0.0);
        assert_eq!(network.biases[2], 0.5);
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            network.clear_state();
            network.set_inputs(&[input]);
            network.activate();
            network.activate();
            assert_eq!(network.outputs()[0], sigmoid(input * 2.0 + 0.5));
        }
    }

    #[test]
    #[should_panic]
    fn wrong_input_count() {
        let genome = Genome::unconnected(&GeneticConfig::zero());
        RecurrentNetwork::new(&genome).set_inputs(&[1.0, 2.0]);
    }
}
