//! Genomes are the focus of evolution in NEAT.
//! They are a collection of connection genes and node genes that
//! can be instantiated as a phenotype (a neural network). Genomes
//! can be progressively mutated, thus adding complexity and functionality.
//!
//! Connection genes carry a _historical marker_, assigned by an
//! [`InnovationRegistry`] shared by the whole run, which is used
//! to align the genes of unrelated genomes during crossover and
//! when measuring the distance between them.

mod config;
mod crossover;
mod errors;
mod genes;
mod mutation;
mod nodes;
mod registry;

pub use config::GeneticConfig;
pub use crossover::{Crossover, Recombiner};
use errors::*;
pub use genes::ConnectionGene;
pub use mutation::{Mutation, Mutator};
pub use nodes::{ActivationType, NodeGene, NodeType};
pub use registry::{InnovationRegistry, SplitRecord};

use crate::Innovation;

use ahash::RandomState;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// A mutable collection of connection genes and nodes.
///
/// Input nodes have ids `0..input_count`, output nodes
/// `input_count..input_count + output_count`, and hidden
/// nodes receive ids from the [`InnovationRegistry`].
///
/// Supports Serde for convenient genome saving and loading.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Genome {
    connections: HashMap<Innovation, ConnectionGene, RandomState>,
    nodes: HashMap<Innovation, NodeGene, RandomState>,
    node_pairings: HashSet<(Innovation, Innovation), RandomState>,
    input_count: usize,
    output_count: usize,
    fitness: Option<f32>,
}

impl Genome {
    /// Create a new genome with the specified configuration.
    ///
    /// The genome contains every input and output node, plus
    /// [`initial_connections`] distinct randomly chosen
    /// input→output connections, whose markers are taken
    /// from `registry`.
    ///
    /// [`initial_connections`]: GeneticConfig::initial_connections
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{GeneticConfig, Genome, InnovationRegistry, NodeType};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_connections: 4,
    ///     weight_init_range: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut registry = InnovationRegistry::new(3, 2);
    ///
    /// let genome = Genome::new(&mut rand::thread_rng(), &mut registry, &config);
    ///
    /// // As configured, the genome should have 3 inputs + 2 outputs.
    /// assert_eq!(genome.nodes().count(), 3 + 2);
    /// assert_eq!(genome.nodes().filter(|n| n.node_type() == NodeType::Input).count(), 3);
    ///
    /// // And 4 of the 6 possible input-output connections.
    /// assert_eq!(genome.connections().count(), 4);
    /// assert!(genome.connections().all(|c| c.weight().abs() <= 1.0));
    /// ```
    pub fn new(
        rng: &mut impl Rng,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
    ) -> Genome {
        let mut genome = Self::unconnected(config);
        let input_count = genome.input_count;
        let output_count = genome.output_count;

        let pairs: Vec<(Innovation, Innovation)> = (0..input_count)
            .flat_map(|i| (0..output_count).map(move |o| (i, o + input_count)))
            .collect();
        let amount = config.initial_connections.min(pairs.len());
        let chosen: Vec<(Innovation, Innovation)> =
            pairs.choose_multiple(rng, amount).copied().collect();

        for (source, target) in chosen {
            let marker = registry.get_or_create_connection_marker(source, target);
            let weight = ConnectionGene::random_weight(rng, config);
            genome.add_connection_unchecked(marker, source, target, weight);
        }

        genome
    }

    /// Create a genome containing only the configured
    /// input and output nodes.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{GeneticConfig, Genome};
    ///
    /// let genome = Genome::unconnected(&GeneticConfig::zero());
    ///
    /// assert_eq!(genome.nodes().count(), 2);
    /// assert_eq!(genome.connections().count(), 0);
    /// ```
    pub fn unconnected(config: &GeneticConfig) -> Genome {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();

        let mut nodes = HashMap::with_capacity_and_hasher(input_count + output_count, RandomState::new());
        for i in 0..input_count {
            nodes.insert(i, NodeGene::new(i, NodeType::Input, ActivationType::Identity));
        }
        for o in 0..output_count {
            let activation = *config
                .output_activation_types
                .get(o)
                .unwrap_or(&ActivationType::Sigmoid);
            nodes.insert(
                o + input_count,
                NodeGene::new(o + input_count, NodeType::Output, activation),
            );
        }

        Genome {
            connections: HashMap::default(),
            nodes,
            node_pairings: HashSet::default(),
            input_count,
            output_count,
            fitness: None,
        }
    }

    /// Add a new connection to the genome.
    /// Returns a reference to the new connection.
    ///
    /// # Panics
    ///
    /// This function will panic if a connection with the same
    /// marker or the same endpoints already exists in the genome,
    /// if either `source` or `target` do not correspond to nodes
    /// present in the genome, or if `target` is an input node.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{ActivationType, GeneticConfig, Genome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut genome = Genome::unconnected(&config);
    ///
    /// let inserted = genome.add_connection(42, 2, 4, 2.5).clone();
    ///
    /// assert_eq!(genome.connection(42), Some(&inserted));
    /// assert_eq!(inserted.endpoints(), (2, 4));
    /// assert_eq!(inserted.weight(), 2.5);
    ///
    /// // Make a cycle (43 goes 3 -> 4, 44 goes 4 -> 3).
    /// genome.add_connection(43, 3, 4, -3.0);
    /// genome.add_connection(44, 4, 3, 1.0);
    ///
    /// // Recurrent self-loop.
    /// genome.add_connection(45, 4, 4, -1.0);
    /// ```
    pub fn add_connection(
        &mut self,
        marker: Innovation,
        source: Innovation,
        target: Innovation,
        weight: f32,
    ) -> &mut ConnectionGene {
        self.check_connection_viability(marker, source, target)
            .unwrap_or_else(|e| panic!("{} in {}", e, self));
        self.add_connection_unchecked(marker, source, target, weight)
    }

    /// Add a new connection to the genome.
    /// Assumes that the connection is not a duplicate
    /// or invalid for the genome.
    fn add_connection_unchecked(
        &mut self,
        marker: Innovation,
        source: Innovation,
        target: Innovation,
        weight: f32,
    ) -> &mut ConnectionGene {
        self.nodes
            .get_mut(&source)
            .expect("connection source exists")
            .add_output_connection(marker);
        self.nodes
            .get_mut(&target)
            .expect("connection target exists")
            .add_input_connection(marker);
        self.node_pairings.insert((source, target));
        self.connections
            .entry(marker)
            .or_insert_with(|| ConnectionGene::new(marker, source, target, weight))
    }

    /// Checks whether a connection is a duplicate or
    /// is invalid for the genome.
    fn check_connection_viability(
        &self,
        marker: Innovation,
        source: Innovation,
        target: Innovation,
    ) -> Result<(), ConnectionValidityError> {
        use ConnectionValidityError::*;
        if self.connections.contains_key(&marker) {
            Err(DuplicateMarker(marker))
        } else if !(self.nodes.contains_key(&source) && self.nodes.contains_key(&target)) {
            Err(NonexistentEndpoints(source, target))
        } else if self.node_pairings.contains(&(source, target)) {
            Err(DuplicateEndpoints(marker, (source, target)))
        } else if self.nodes[&target].node_type() == NodeType::Input {
            Err(InputTarget(target))
        } else {
            Ok(())
        }
    }

    /// Add a new hidden node to the genome.
    /// Returns a reference to the newly created node.
    ///
    /// # Panics
    ///
    /// This function panics if a node with the
    /// same id already exists in the genome.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{ActivationType, GeneticConfig, Genome, NodeType};
    ///
    /// let mut genome = Genome::unconnected(&GeneticConfig::zero());
    /// let inserted = genome.add_node(42, ActivationType::Sigmoid).clone();
    ///
    /// assert_eq!(genome.nodes().count(), 1 + 1 + 1);
    /// assert_eq!(inserted.node_type(), NodeType::Hidden);
    /// ```
    pub fn add_node(&mut self, id: Innovation, activation_type: ActivationType) -> &mut NodeGene {
        self.check_node_viability(id)
            .unwrap_or_else(|e| panic!("{} in {}", e, self));
        self.add_node_unchecked(id, activation_type)
    }

    /// Add a new hidden node to the genome.
    /// Assumes the node is not a duplicate.
    fn add_node_unchecked(&mut self, id: Innovation, activation_type: ActivationType) -> &mut NodeGene {
        self.nodes
            .entry(id)
            .or_insert_with(|| NodeGene::new(id, NodeType::Hidden, activation_type))
    }

    fn check_node_viability(&self, id: Innovation) -> Result<(), NodeValidityError> {
        if self.nodes.contains_key(&id) {
            Err(NodeValidityError::DuplicateNodeID(id))
        } else {
            Ok(())
        }
    }

    /// Calculates the _compatibility distance_ between two genomes:
    ///
    /// `(c1 ⨯ disjoint + c2 ⨯ excess) / N + c3 ⨯ W`
    ///
    /// where _disjoint_ counts unmatched markers within the smaller
    /// of the two genomes' marker ranges, _excess_ counts unmatched
    /// markers beyond it, `N` is the connection count of the larger
    /// genome (at least 1), and `W` is the mean absolute weight
    /// difference of matching connections (0 if there are none).
    ///
    /// The distance is symmetric, and 0 between identical genomes.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{ActivationType, GeneticConfig, Genome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut genome1 = Genome::unconnected(&config);
    /// let mut genome2 = Genome::unconnected(&config);
    /// genome1.add_node(3, ActivationType::Sigmoid);
    /// genome2.add_node(3, ActivationType::Sigmoid);
    ///
    /// // Matching, weight difference of 2.0.
    /// genome1.add_connection(0, 0, 2, 1.0);
    /// genome2.add_connection(0, 0, 2, -1.0);
    /// // Disjoint.
    /// genome1.add_connection(1, 1, 2, 3.0);
    /// genome2.add_connection(2, 1, 3, 1.0);
    /// // Matching, weight difference of 0.0.
    /// genome1.add_connection(3, 3, 2, 1.0);
    /// genome2.add_connection(3, 3, 2, 1.0);
    /// // Excess.
    /// genome1.add_connection(4, 0, 3, 3.0);
    ///
    /// let distance = Genome::compatibility_distance(&genome1, &genome2, 0.5, 1.5, 0.25);
    /// assert_eq!(distance, (0.5 * 2.0 + 1.5 * 1.0) / 4.0 + 0.25 * (2.0 + 0.0) / 2.0);
    /// ```
    pub fn compatibility_distance(first: &Genome, second: &Genome, c1: f32, c2: f32, c3: f32) -> f32 {
        let max_first = first.connections.keys().copied().max();
        let max_second = second.connections.keys().copied().max();
        let range_end = match (max_first, max_second) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        };

        let mut matching = 0usize;
        let mut weight_diff_sum = 0.0;
        let mut disjoint = 0usize;
        let mut excess = 0usize;

        let mut classify_unmatched = |marker: Innovation| match range_end {
            Some(end) if marker <= end => disjoint += 1,
            _ => excess += 1,
        };

        for (marker, connection) in &first.connections {
            match second.connections.get(marker) {
                Some(other) => {
                    matching += 1;
                    weight_diff_sum += (connection.weight() - other.weight()).abs();
                }
                None => classify_unmatched(*marker),
            }
        }
        for marker in second.connections.keys() {
            if !first.connections.contains_key(marker) {
                classify_unmatched(*marker);
            }
        }

        let normalizer = first.connections.len().max(second.connections.len()).max(1) as f32;
        let mean_weight_diff = if matching > 0 {
            weight_diff_sum / matching as f32
        } else {
            0.0
        };

        (c1 * disjoint as f32 + c2 * excess as f32) / normalizer + c3 * mean_weight_diff
    }

    /// Calculates the compatibility distance between `first` and `second`
    /// using the factors specified in `config`.
    pub fn genetic_distance(first: &Genome, second: &Genome, config: &GeneticConfig) -> f32 {
        Self::compatibility_distance(
            first,
            second,
            config.disjoint_gene_factor,
            config.excess_gene_factor,
            config.common_weight_factor,
        )
    }

    /// Returns whether an enabled `source → target` connection
    /// would close a cycle among the genome's enabled connections.
    /// Self-loops always count as cycles.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{ActivationType, GeneticConfig, Genome};
    ///
    /// let mut genome = Genome::unconnected(&GeneticConfig::zero());
    /// genome.add_node(2, ActivationType::Sigmoid);
    /// genome.add_connection(0, 0, 2, 1.0);
    /// genome.add_connection(1, 2, 1, 1.0);
    ///
    /// assert!(genome.creates_cycle(1, 2));
    /// assert!(genome.creates_cycle(2, 2));
    /// assert!(!genome.creates_cycle(0, 1));
    /// ```
    pub fn creates_cycle(&self, source: Innovation, target: Innovation) -> bool {
        if source == target {
            return true;
        }
        let mut visited: HashSet<Innovation, RandomState> = HashSet::default();
        let mut frontier = VecDeque::from([target]);
        visited.insert(target);
        while let Some(node) = frontier.pop_front() {
            for next in self.enabled_successors(node) {
                if next == source {
                    return true;
                }
                if visited.insert(next) {
                    frontier.push_back(next);
                }
            }
        }
        false
    }

    fn enabled_successors(&self, node: Innovation) -> impl Iterator<Item = Innovation> + '_ {
        self.nodes
            .get(&node)
            .into_iter()
            .flat_map(|n| n.output_connections())
            .map(|marker| &self.connections[marker])
            .filter(|c| c.enabled())
            .map(|c| c.target())
    }

    /// Returns whether the genome's enabled connections contain a cycle.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{GeneticConfig, Genome};
    ///
    /// let mut genome = Genome::unconnected(&GeneticConfig::zero());
    /// assert!(!genome.has_cycle());
    ///
    /// genome.add_connection(0, 1, 1, 1.0);
    /// assert!(genome.has_cycle());
    /// ```
    pub fn has_cycle(&self) -> bool {
        let mut in_degree: HashMap<Innovation, usize, RandomState> =
            self.nodes.keys().map(|id| (*id, 0)).collect();
        for connection in self.connections.values().filter(|c| c.enabled()) {
            *in_degree.entry(connection.target()).or_default() += 1;
        }

        let mut ready: Vec<Innovation> = in_degree
            .iter()
            .filter_map(|(id, degree)| if *degree == 0 { Some(*id) } else { None })
            .collect();
        let mut visited = 0;
        while let Some(node) = ready.pop() {
            visited += 1;
            for next in self.enabled_successors(node) {
                let degree = in_degree.get_mut(&next).expect("successor is a genome node");
                *degree -= 1;
                if *degree == 0 {
                    ready.push(next);
                }
            }
        }

        visited < self.nodes.len()
    }

    /// Panics if the genome breaks one of its structural invariants:
    /// dangling connection endpoints, connections filed under the
    /// wrong marker, duplicate endpoint pairs, or missing input/output
    /// nodes. These can only be caused by defects, never by evolution.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig {
    ///     initial_connections: 1,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut registry = InnovationRegistry::new(1, 1);
    /// let genome = Genome::new(&mut rand::thread_rng(), &mut registry, &config);
    ///
    /// genome.check_integrity();
    /// ```
    pub fn check_integrity(&self) {
        if let Err(e) = self.integrity_status() {
            panic!("{} in {}", e, self);
        }
    }

    fn integrity_status(&self) -> Result<(), IntegrityError> {
        use IntegrityError::*;
        for id in 0..self.input_count + self.output_count {
            if !self.nodes.contains_key(&id) {
                return Err(MissingFixedNode(id));
            }
        }
        let mut pairs: HashSet<(Innovation, Innovation), RandomState> = HashSet::default();
        for (key, connection) in &self.connections {
            if *key != connection.marker() {
                return Err(MisfiledConnection(*key, connection.marker()));
            }
            let (source, target) = connection.endpoints();
            if !(self.nodes.contains_key(&source) && self.nodes.contains_key(&target)) {
                return Err(DanglingConnection(*key, (source, target)));
            }
            if !pairs.insert((source, target)) {
                return Err(DuplicateEndpoints(*key, (source, target)));
            }
        }
        Ok(())
    }

    /// Panics if the genome breaks a structural invariant,
    /// or contains a cycle while `config` forbids recurrence.
    pub fn check_conforms_to(&self, config: &GeneticConfig) {
        self.check_integrity();
        if !config.allow_recurrence && self.has_cycle() {
            panic!("{} in {}", IntegrityError::Cycle, self);
        }
    }

    /// Returns an iterator over the genome's connection genes.
    ///
    /// # Notes
    /// No ordering is guaranteed.
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionGene> {
        self.connections.values()
    }

    /// Returns an iterator over the genome's node genes.
    ///
    /// # Notes
    /// No ordering is guaranteed.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeGene> {
        self.nodes.values()
    }

    /// Returns the connection with the specified marker, if present.
    pub fn connection(&self, marker: Innovation) -> Option<&ConnectionGene> {
        self.connections.get(&marker)
    }

    /// Returns the connection between the specified nodes, if present.
    pub fn connection_between(&self, source: Innovation, target: Innovation) -> Option<&ConnectionGene> {
        if !self.node_pairings.contains(&(source, target)) {
            return None;
        }
        self.nodes[&source]
            .output_connections()
            .map(|marker| &self.connections[marker])
            .find(|c| c.target() == target)
    }

    /// Returns the node with the specified id, if present.
    pub fn node(&self, id: Innovation) -> Option<&NodeGene> {
        self.nodes.get(&id)
    }

    /// Returns the ids of the genome's input nodes, in order.
    pub fn input_ids(&self) -> std::ops::Range<Innovation> {
        0..self.input_count
    }

    /// Returns the ids of the genome's output nodes, in order.
    pub fn output_ids(&self) -> std::ops::Range<Innovation> {
        self.input_count..self.input_count + self.output_count
    }

    /// Returns the number of input nodes.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Returns the number of output nodes.
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Returns the genome's `(node count, enabled connection count)`.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{GeneticConfig, Genome};
    ///
    /// let mut genome = Genome::unconnected(&GeneticConfig::zero());
    /// genome.add_connection(0, 0, 1, 1.0).set_enabled(false);
    ///
    /// assert_eq!(genome.shape(), (2, 0));
    /// ```
    pub fn shape(&self) -> (usize, usize) {
        (
            self.nodes.len(),
            self.connections.values().filter(|c| c.enabled()).count(),
        )
    }

    /// Sets the genome's fitness to the value passed.
    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = Some(fitness);
    }

    /// Returns the genome's fitness, or `None`
    /// if it has not been evaluated.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{GeneticConfig, Genome};
    ///
    /// let mut genome = Genome::unconnected(&GeneticConfig::zero());
    /// assert_eq!(genome.fitness(), None);
    ///
    /// genome.set_fitness(32.0);
    /// assert_eq!(genome.fitness(), Some(32.0));
    /// ```
    pub fn fitness(&self) -> Option<f32> {
        self.fitness
    }

    /// Fitness used for ranking: unevaluated genomes rank last.
    pub(crate) fn ranking_fitness(&self) -> f32 {
        self.fitness.unwrap_or(f32::NEG_INFINITY)
    }

    pub(crate) fn clear_fitness(&mut self) {
        self.fitness = None;
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut connections: Vec<&ConnectionGene> = self.connections.values().collect();
        let mut nodes: Vec<&NodeGene> = self.nodes.values().collect();
        connections.sort_unstable_by_key(|c| c.marker());
        nodes.sort_unstable_by_key(|n| n.id());
        f.debug_struct("Genome")
            .field("Connections", &connections)
            .field("Nodes", &nodes)
            .field("Fitness", &self.fitness)
            .finish()
    }
}
