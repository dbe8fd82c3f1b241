use crate::genomics::{
    ActivationType, ConnectionGene, GeneticConfig, Genome, InnovationRegistry, NodeGene, NodeType,
};
use crate::Innovation;

use rand::seq::SliceRandom;
use rand::Rng;

/// A `Mutator` applies random changes to a genome
/// freshly produced by crossover.
///
/// Any new structure must take its identities from
/// `registry`, so that identical mutations across the
/// population are recognized as such.
pub trait Mutator {
    /// Mutates `genome` in place.
    fn mutate(
        &self,
        genome: &mut Genome,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    );
}

/// The standard NEAT mutation scheme.
///
/// Weights and biases are mutated first, then a node addition is attempted with
/// [`add_node_chance`], a connection addition with [`add_connection_chance`],
/// and lastly enabled flags are toggled.
///
/// [`add_node_chance`]: GeneticConfig::add_node_chance
/// [`add_connection_chance`]: GeneticConfig::add_connection_chance
#[derive(Clone, Copy, Debug, Default)]
pub struct Mutation;

impl Mutator for Mutation {
    fn mutate(
        &self,
        genome: &mut Genome,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) {
        genome.mutate_weights(rng, config);
        genome.mutate_biases(rng, config);
        if rng.gen::<f32>() < config.add_node_chance {
            genome.mutate_add_node(rng, registry, config);
        }
        if rng.gen::<f32>() < config.add_connection_chance {
            genome.mutate_add_connection(rng, registry, config);
        }
        genome.mutate_toggle_enable(rng, config);
    }
}

impl Genome {
    /// Mutates the weights of the genome's enabled connections.
    ///
    /// Each enabled connection is mutated with [`weight_mutation_chance`].
    /// A mutated weight is replaced by a fresh random value with
    /// [`weight_replace_chance`], and perturbed by a Gaussian step
    /// otherwise.
    ///
    /// [`weight_mutation_chance`]: GeneticConfig::weight_mutation_chance
    /// [`weight_replace_chance`]: GeneticConfig::weight_replace_chance
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig {
    ///     initial_connections: 1,
    ///     weight_init_range: 1.0,
    ///     weight_bound: 1.0,
    ///     weight_mutation_chance: 1.0,
    ///     weight_replace_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = rand::thread_rng();
    /// let mut genome = Genome::new(&mut rng, &mut InnovationRegistry::new(1, 1), &config);
    ///
    /// genome.mutate_weights(&mut rng, &config);
    ///
    /// // Replaced weights stay within the initialization range.
    /// assert!(genome.connections().all(|c| c.weight().abs() <= 1.0));
    /// ```
    pub fn mutate_weights(&mut self, rng: &mut impl Rng, config: &GeneticConfig) {
        for marker in self.sorted_markers() {
            let connection = match self.connections.get_mut(&marker) {
                Some(c) if c.enabled() => c,
                _ => continue,
            };
            if rng.gen::<f32>() < config.weight_mutation_chance {
                if rng.gen::<f32>() < config.weight_replace_chance {
                    connection.randomize_weight(rng, config);
                } else {
                    connection.perturb_weight(rng, config);
                }
            }
        }
    }

    /// Mutates the biases of the genome's output and hidden nodes.
    ///
    /// Each such node is mutated with [`bias_mutation_chance`].
    /// A mutated bias is replaced by a fresh random value with
    /// [`bias_replace_chance`], and perturbed like a weight otherwise.
    ///
    /// [`bias_mutation_chance`]: GeneticConfig::bias_mutation_chance
    /// [`bias_replace_chance`]: GeneticConfig::bias_replace_chance
    pub fn mutate_biases(&mut self, rng: &mut impl Rng, config: &GeneticConfig) {
        for id in self.sorted_node_ids() {
            let node = match self.nodes.get_mut(&id) {
                Some(n) if n.node_type() != NodeType::Input => n,
                _ => continue,
            };
            if rng.gen::<f32>() < config.bias_mutation_chance {
                if rng.gen::<f32>() < config.bias_replace_chance {
                    node.randomize_bias(rng, config);
                } else {
                    node.perturb_bias(rng, config);
                }
            }
        }
    }

    /// Induces a _connection mutation_ in the genome.
    /// If successful, returns the new (or re-enabled) connection.
    ///
    /// Up to [`max_add_connection_attempts`] random `(source, target)`
    /// candidates are tried, where the source is any node and the target
    /// any non-input node. A candidate is rejected if an enabled connection
    /// already joins the pair, or if it would close a cycle while
    /// [`allow_recurrence`] is false. A disabled connection between the
    /// pair is re-enabled instead of duplicated.
    ///
    /// Returns `None` if no candidate was accepted.
    ///
    /// [`max_add_connection_attempts`]: GeneticConfig::max_add_connection_attempts
    /// [`allow_recurrence`]: GeneticConfig::allow_recurrence
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig {
    ///     weight_init_range: 1.0,
    ///     max_add_connection_attempts: 1,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut registry = InnovationRegistry::new(1, 1);
    /// let mut genome = Genome::unconnected(&config);
    ///
    /// // With a single input and a single output, and no recurrence,
    /// // the only candidate is the 0 -> 1 connection.
    /// let connection = genome
    ///     .mutate_add_connection(&mut rand::thread_rng(), &mut registry, &config)
    ///     .cloned();
    ///
    /// if let Some(connection) = connection {
    ///     assert_eq!(connection.endpoints(), (0, 1));
    ///     assert_eq!(connection.marker(), 0);
    /// }
    /// ```
    pub fn mutate_add_connection(
        &mut self,
        rng: &mut impl Rng,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
    ) -> Option<&ConnectionGene> {
        let (source, target) = self.find_connection_candidate(rng, config)?;

        match self.connection_between(source, target).map(|c| c.marker()) {
            Some(marker) => {
                let connection = self.connections.get_mut(&marker)?;
                connection.set_enabled(true);
                Some(&*connection)
            }
            None => {
                let marker = registry.get_or_create_connection_marker(source, target);
                let weight = ConnectionGene::random_weight(rng, config);
                Some(&*self.add_connection(marker, source, target, weight))
            }
        }
    }

    fn find_connection_candidate(
        &self,
        rng: &mut impl Rng,
        config: &GeneticConfig,
    ) -> Option<(Innovation, Innovation)> {
        let sources = self.sorted_node_ids();
        let targets: Vec<Innovation> = sources
            .iter()
            .copied()
            .filter(|id| self.nodes[id].node_type() != NodeType::Input)
            .collect();

        for _ in 0..config.max_add_connection_attempts {
            let source = *sources.choose(rng)?;
            let target = *targets.choose(rng)?;
            if matches!(self.connection_between(source, target), Some(c) if c.enabled()) {
                continue;
            }
            if !config.allow_recurrence && self.creates_cycle(source, target) {
                continue;
            }
            return Some((source, target));
        }
        None
    }

    /// Induces a _node mutation_ in the genome.
    /// If successful, returns the triplet (_in connection_, _new node_,
    /// _out connection_) as a tuple of references.
    ///
    /// A random enabled connection is disabled and replaced by a new
    /// hidden node with two connections: source→node with weight 1.0,
    /// and node→target with the old connection's weight. Identities
    /// come from `registry`, so the same split performed by different
    /// genomes yields the same genes.
    ///
    /// Returns `None` if the genome has no enabled connections.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{ActivationType, GeneticConfig, Genome, InnovationRegistry, NodeType};
    ///
    /// let config = GeneticConfig {
    ///     initial_connections: 1,
    ///     weight_init_range: 1.0,
    ///     hidden_activation_types: vec![ActivationType::ReLU],
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = rand::thread_rng();
    /// let mut registry = InnovationRegistry::new(1, 1);
    /// let mut genome = Genome::new(&mut rng, &mut registry, &config);
    ///
    /// let prev_connection = genome.connections().next().unwrap().clone();
    ///
    /// let (new_in, new_node, new_out) = genome
    ///     .mutate_add_node(&mut rng, &mut registry, &config)
    ///     .unwrap();
    ///
    /// assert_eq!(new_in.target(), new_node.id());
    /// assert_eq!(new_in.weight(), 1.0);
    /// assert_eq!(new_out.source(), new_node.id());
    /// assert_eq!(new_out.weight(), prev_connection.weight());
    /// assert_eq!(new_node.node_type(), NodeType::Hidden);
    /// assert_eq!(new_node.activation_type(), ActivationType::ReLU);
    ///
    /// // The split connection is disabled.
    /// assert!(!genome.connection(prev_connection.marker()).unwrap().enabled());
    /// assert_eq!(genome.shape(), (1 + 1 + 1, 2));
    /// ```
    pub fn mutate_add_node(
        &mut self,
        rng: &mut impl Rng,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
    ) -> Option<(&ConnectionGene, &NodeGene, &ConnectionGene)> {
        let enabled: Vec<Innovation> = self
            .sorted_markers()
            .into_iter()
            .filter(|m| self.connections[m].enabled())
            .collect();
        let split = *enabled.choose(rng)?;

        let (new_node, marker_in, marker_out) = match registry.split_connection(split) {
            (node, ..) if self.nodes.contains_key(&node) => registry.fresh_split(split),
            record => record,
        };

        let old = self.connections.get_mut(&split)?;
        old.set_enabled(false);
        let (source, target) = old.endpoints();
        let weight = old.weight();

        let activation = *config
            .hidden_activation_types
            .choose(rng)
            .unwrap_or(&ActivationType::Sigmoid);
        self.add_node(new_node, activation);
        self.add_connection(marker_in, source, new_node, 1.0);
        self.add_connection(marker_out, new_node, target, weight);

        Some((
            &self.connections[&marker_in],
            &self.nodes[&new_node],
            &self.connections[&marker_out],
        ))
    }

    /// Flips the enabled flag of each connection with [`toggle_enable_chance`].
    /// Re-enabling a connection which would close a cycle is skipped
    /// when [`allow_recurrence`] is false.
    ///
    /// Returns the number of connections toggled.
    ///
    /// [`toggle_enable_chance`]: GeneticConfig::toggle_enable_chance
    /// [`allow_recurrence`]: GeneticConfig::allow_recurrence
    pub fn mutate_toggle_enable(&mut self, rng: &mut impl Rng, config: &GeneticConfig) -> usize {
        let mut toggled = 0;
        for marker in self.sorted_markers() {
            if rng.gen::<f32>() >= config.toggle_enable_chance {
                continue;
            }
            let connection = &self.connections[&marker];
            if !connection.enabled()
                && !config.allow_recurrence
                && self.creates_cycle(connection.source(), connection.target())
            {
                continue;
            }
            if let Some(connection) = self.connections.get_mut(&marker) {
                connection.set_enabled(!connection.enabled());
                toggled += 1;
            }
        }
        toggled
    }

    /// Connection markers in ascending order, so that
    /// seeded runs are reproducible.
    pub(crate) fn sorted_markers(&self) -> Vec<Innovation> {
        let mut markers: Vec<Innovation> = self.connections.keys().copied().collect();
        markers.sort_unstable();
        markers
    }

    fn sorted_node_ids(&self) -> Vec<Innovation> {
        let mut ids: Vec<Innovation> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
