use super::{index_map, ordered_nodes, Connection};
use crate::genomics::{ActivationType, Genome};
use crate::Innovation;

use ahash::RandomState;

use std::collections::HashSet;

/// A network evaluated in a single pass, with
/// every node computed once per activation.
///
/// Nodes are grouped into layers by their distance
/// from the inputs. Only nodes whose values reach an
/// output are computed; nodes on a cycle are never
/// computed, so outputs depending on them read 0.
#[derive(Clone, Debug)]
pub struct FeedForwardNetwork {
    input_count: usize,
    output_count: usize,
    values: Box<[f32]>,
    node_evals: Box<[NodeEval]>,
}

#[derive(Clone, Debug)]
struct NodeEval {
    node: usize,
    activation_type: ActivationType,
    bias: f32,
    inputs: Box<[Connection]>,
}

impl FeedForwardNetwork {
    /// Generates a new network from the passed genome.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::{
    ///     genomics::{ActivationType, GeneticConfig, Genome},
    ///     networks::FeedForwardNetwork,
    /// };
    /// use std::num::NonZeroUsize;
    ///
    /// let mut genome = Genome::unconnected(&GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_activation_types: vec![ActivationType::Identity],
    ///     ..GeneticConfig::zero()
    /// });
    /// genome.add_connection(0, 0, 2, 0.5);
    /// genome.add_connection(1, 1, 2, -2.0);
    ///
    /// let mut network = FeedForwardNetwork::new(&genome);
    /// assert_eq!(network.activate(&[4.0, 1.0]), vec![0.0]);
    /// ```
    pub fn new(genome: &Genome) -> FeedForwardNetwork {
        let nodes = ordered_nodes(genome);
        let node_ids: Vec<Innovation> = nodes.iter().map(|n| n.id()).collect();
        let node_index_from_id = index_map(&node_ids);

        let mut connections: Vec<_> = genome.connections().filter(|c| c.enabled()).collect();
        connections.sort_unstable_by_key(|c| c.marker());
        let endpoints: Vec<_> = connections.iter().map(|c| c.endpoints()).collect();

        let node_evals = feed_forward_layers(genome, &endpoints)
            .into_iter()
            .flatten()
            .map(|id| {
                let node = node_index_from_id[&id];
                let inputs = connections
                    .iter()
                    .filter(|c| c.target() == id)
                    .map(|c| Connection::new(node_index_from_id[&c.source()], c.weight()))
                    .collect();
                NodeEval {
                    node,
                    activation_type: nodes[node].activation_type(),
                    bias: nodes[node].bias(),
                    inputs,
                }
            })
            .collect();

        FeedForwardNetwork {
            input_count: genome.input_count(),
            output_count: genome.output_count(),
            values: vec![0.0; node_ids.len()].into(),
            node_evals,
        }
    }

    /// Returns the outputs of the network for `inputs`.
    ///
    /// # Panics
    /// Panics if the length of `inputs` is not
    /// equal to the number of inputs in the network.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::{
    ///     genomics::{ActivationType, GeneticConfig, Genome},
    ///     networks::FeedForwardNetwork,
    /// };
    ///
    /// fn sigmoid(x: f32) -> f32 {
    ///     1.0 / (1.0 + (-4.9 * x).exp())
    /// }
    ///
    /// let mut genome = Genome::unconnected(&GeneticConfig::zero());
    /// genome.add_node(2, ActivationType::Sigmoid);
    /// genome.add_connection(0, 0, 2, 1.0);
    /// genome.add_connection(1, 2, 1, 1.0);
    /// let mut network = FeedForwardNetwork::new(&genome);
    ///
    /// for input in -20..=20 {
    ///     let input = input as f32 / 10.0;
    ///     assert_eq!(network.activate(&[input])[0], sigmoid(sigmoid(input)));
    /// }
    /// ```
    pub fn activate(&mut self, inputs: &[f32]) -> Vec<f32> {
        assert_eq!(
            inputs.len(),
            self.input_count,
            "expected {} inputs, got {}",
            self.input_count,
            inputs.len()
        );
        self.values[..self.input_count].copy_from_slice(inputs);

        for eval in self.node_evals.iter() {
            let input_sum: f32 = eval
                .inputs
                .iter()
                .map(|c| self.values[c.node] * c.weight)
                .sum();
            self.values[eval.node] = eval.activation_type.apply(eval.bias + input_sum);
        }

        self.values[self.input_count..self.input_count + self.output_count].to_vec()
    }
}

/// Returns the set of non-input nodes whose values
/// flow into some output.
fn required_for_output(
    genome: &Genome,
    connections: &[(Innovation, Innovation)],
) -> HashSet<Innovation, RandomState> {
    let mut required: HashSet<_, RandomState> = genome.output_ids().collect();
    let mut reached = required.clone();
    loop {
        let sources: HashSet<_, RandomState> = connections
            .iter()
            .filter(|(s, t)| reached.contains(t) && !reached.contains(s))
            .map(|(s, _)| *s)
            .collect();
        let layer_nodes: Vec<_> = sources
            .iter()
            .copied()
            .filter(|s| !genome.input_ids().contains(s))
            .collect();
        if layer_nodes.is_empty() {
            break;
        }
        required.extend(layer_nodes);
        reached.extend(sources);
    }
    required
}

/// Groups the required nodes into layers: a node joins a layer
/// once all its sources are inputs or in previous layers.
/// Each layer is sorted by node id.
fn feed_forward_layers(
    genome: &Genome,
    connections: &[(Innovation, Innovation)],
) -> Vec<Vec<Innovation>> {
    let required = required_for_output(genome, connections);
    let mut layers = vec![];
    let mut settled: HashSet<_, RandomState> = genome.input_ids().collect();
    loop {
        let candidates: HashSet<_, RandomState> = connections
            .iter()
            .filter(|(s, t)| settled.contains(s) && !settled.contains(t))
            .map(|(_, t)| *t)
            .collect();
        let mut layer: Vec<_> = candidates
            .into_iter()
            .filter(|n| {
                required.contains(n)
                    && connections
                        .iter()
                        .filter(|(_, t)| t == n)
                        .all(|(s, _)| settled.contains(s))
            })
            .collect();
        if layer.is_empty() {
            break;
        }
        layer.sort_unstable();
        settled.extend(layer.iter().copied());
        layers.push(layer);
    }
    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{GeneticConfig, InnovationRegistry};
    use std::num::NonZeroUsize;

    fn sigmoid(x: f32) -> f32 {
        1.0 / (1.0 + (-4.9 * x).exp())
    }

    fn two_by_one() -> Genome {
        Genome::unconnected(&GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            ..GeneticConfig::zero()
        })
    }

    #[test]
    fn layering() {
        let mut genome = two_by_one();
        genome.add_node(3, ActivationType::Sigmoid);
        genome.add_node(4, ActivationType::Sigmoid);
        genome.add_connection(0, 0, 3, 1.0);
        genome.add_connection(1, 3, 4, 1.0);
        genome.add_connection(2, 4, 2, 1.0);
        genome.add_connection(3, 1, 2, 1.0);
        genome.add_connection(4, 1, 4, 1.0);
        let endpoints: Vec<_> = genome.connections().map(|c| c.endpoints()).collect();

        assert_eq!(feed_forward_layers(&genome, &endpoints), vec![vec![3], vec![4], vec![2]]);
    }

    #[test]
    fn unused_nodes_are_skipped() {
        let mut genome = two_by_one();
        genome.add_node(3, ActivationType::Sigmoid);
        genome.add_connection(0, 0, 2, 1.0);
        // Dead end: node 3 never reaches the output.
        genome.add_connection(1, 1, 3, 1.0);
        let endpoints: Vec<_> = genome.connections().map(|c| c.endpoints()).collect();

        assert_eq!(feed_forward_layers(&genome, &endpoints), vec![vec![2]]);
        let mut network = FeedForwardNetwork::new(&genome);
        assert_eq!(network.activate(&[0.3, 9.0]), vec![sigmoid(0.3)]);
    }

    #[test]
    fn disabled_connections_are_ignored() {
        let mut genome = two_by_one();
        genome.add_connection(0, 0, 2, 1.0);
        genome.add_connection(1, 1, 2, 1.0).set_enabled(false);
        let mut network = FeedForwardNetwork::new(&genome);
        assert_eq!(network.activate(&[-0.4, 100.0]), vec![sigmoid(-0.4)]);
    }

    #[test]
    fn biases_are_applied() {
        let mut genome = two_by_one();
        genome.add_node(3, ActivationType::Identity).set_bias(-1.0);
        genome.add_connection(0, 0, 3, 1.0);
        genome.add_connection(1, 3, 2, 1.0);
        genome.add_connection(2, 1, 2, 1.0);
        let mut network = FeedForwardNetwork::new(&genome);
        assert_eq!(network.activate(&[3.0, 0.5]), vec![sigmoid(2.0 + 0.5)]);
    }

    #[test]
    fn disconnected_output_reads_zero() {
        let mut network = FeedForwardNetwork::new(&two_by_one());
        assert_eq!(network.activate(&[1.0, 1.0]), vec![0.0]);
    }

    #[test]
    fn cycles_are_not_computed() {
        let mut genome = two_by_one();
        genome.add_node(3, ActivationType::Sigmoid);
        genome.add_connection(0, 0, 3, 1.0);
        genome.add_connection(1, 3, 3, 1.0);
        genome.add_connection(2, 3, 2, 1.0);
        genome.add_connection(3, 1, 2, 1.0);
        let mut network = FeedForwardNetwork::new(&genome);
        for _ in 0..3 {
            assert_eq!(network.activate(&[1.0, 1.0]), vec![0.0]);
        }
    }

    #[test]
    fn matches_recurrent_network_when_settled() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(3).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            initial_connections: 6,
            bias_mutation_chance: 1.0,
            ..GeneticConfig::default()
        };
        let mut registry = InnovationRegistry::new(3, 2);
        let mut rng = rand::thread_rng();
        let mut genome = Genome::new(&mut rng, &mut registry, &config);
        genome.mutate_biases(&mut rng, &config);

        let inputs = [0.2, -0.7, 1.3];
        let mut feed_forward = FeedForwardNetwork::new(&genome);
        let mut recurrent = super::super::RecurrentNetwork::new(&genome);
        for (a, b) in feed_forward.activate(&inputs).iter().zip(recurrent.step(&inputs)) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    #[should_panic(expected = "expected 2 inputs, got 1")]
    fn wrong_input_count() {
        FeedForwardNetwork::new(&two_by_one()).activate(&[1.0]);
    }
}
