use crate::genomics::{ConnectionGene, GeneticConfig, Genome, NodeGene, NodeType};
use crate::Innovation;

use rand::Rng;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

/// A `Recombiner` produces a child genome from two parents.
///
/// Both parents may be the same genome, in which case the
/// result should be an unmutated copy of its structure
/// (asexual reproduction).
pub trait Recombiner {
    /// Returns the offspring of `first` and `second`.
    fn recombine(
        &self,
        first: &Genome,
        second: &Genome,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> Genome;
}

/// Standard NEAT crossover: connections are aligned
/// by historical marker.
///
/// - Matching connections are inherited from a random parent. If
///   either parent's copy is disabled, the child's copy is disabled
///   with [`disabled_inheritance_chance`]. A connection disabled in
///   both parents is always inherited disabled.
/// - Unmatched (disjoint and excess) connections are inherited only
///   from the fitter parent. If both parents are equally fit, one
///   of them is picked at random to count as the fitter.
/// - If [`allow_recurrence`] is false, an inherited connection
///   which would close a cycle in the child is inherited disabled.
///
/// The child receives every input and output node, plus any hidden
/// node referenced by its connections. Node activations and biases
/// come from the fitter parent.
///
/// [`disabled_inheritance_chance`]: GeneticConfig::disabled_inheritance_chance
/// [`allow_recurrence`]: GeneticConfig::allow_recurrence
///
/// # Examples
/// ```
/// use ferroneat::genomics::{Crossover, GeneticConfig, Genome, Recombiner};
/// use std::num::NonZeroUsize;
///
/// let config = GeneticConfig {
///     input_count: NonZeroUsize::new(2).unwrap(),
///     ..GeneticConfig::zero()
/// };
/// let mut fitter = Genome::unconnected(&config);
/// fitter.add_connection(0, 0, 2, 1.0);
/// fitter.set_fitness(10.0);
///
/// let mut weaker = Genome::unconnected(&config);
/// weaker.add_connection(1, 1, 2, 1.0);
/// weaker.set_fitness(1.0);
///
/// let child = Crossover.recombine(&fitter, &weaker, &config, &mut rand::thread_rng());
///
/// assert!(child.connection(0).is_some());
/// assert!(child.connection(1).is_none());
/// assert_eq!(child.fitness(), None);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Crossover;

impl Recombiner for Crossover {
    fn recombine(
        &self,
        first: &Genome,
        second: &Genome,
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) -> Genome {
        let ordering = first
            .ranking_fitness()
            .partial_cmp(&second.ranking_fitness())
            .unwrap_or(Ordering::Equal);
        let (fitter, weaker) = match ordering {
            Ordering::Less => (second, first),
            Ordering::Equal if rng.gen::<bool>() => (second, first),
            _ => (first, second),
        };

        let markers: BTreeSet<Innovation> = fitter
            .connections
            .keys()
            .chain(weaker.connections.keys())
            .copied()
            .collect();

        let mut child = Genome::io_skeleton_of(fitter);
        for marker in markers {
            let inherited = match (fitter.connections.get(&marker), weaker.connections.get(&marker)) {
                (Some(a), Some(b)) => Some(inherit_matching(a, b, config, rng)),
                (Some(a), None) => Some(a.clone()),
                _ => None,
            };
            if let Some(connection) = inherited {
                child.inherit_connection(connection, fitter, weaker, config);
            }
        }

        child
    }
}

fn inherit_matching(
    a: &ConnectionGene,
    b: &ConnectionGene,
    config: &GeneticConfig,
    rng: &mut impl Rng,
) -> ConnectionGene {
    let mut connection = if rng.gen::<bool>() { a.clone() } else { b.clone() };
    let enabled = match (a.enabled(), b.enabled()) {
        (true, true) => true,
        (false, false) => false,
        _ => rng.gen::<f32>() >= config.disabled_inheritance_chance,
    };
    connection.set_enabled(enabled);
    connection
}

impl Genome {
    /// A connectionless genome with the same
    /// input and output nodes as `parent`.
    fn io_skeleton_of(parent: &Genome) -> Genome {
        let nodes: HashMap<_, _, _> = parent
            .nodes
            .values()
            .filter(|n| n.node_type() != NodeType::Hidden)
            .map(|n| {
                let mut node = NodeGene::new(n.id(), n.node_type(), n.activation_type());
                node.set_bias(n.bias());
                (n.id(), node)
            })
            .collect();

        Genome {
            connections: HashMap::default(),
            nodes,
            node_pairings: HashSet::default(),
            input_count: parent.input_count,
            output_count: parent.output_count,
            fitness: None,
        }
    }

    /// Adds an inherited connection, along with any hidden endpoint
    /// missing from `self`. Hidden node activations and biases are
    /// copied from the fitter parent when it owns the node.
    fn inherit_connection(
        &mut self,
        mut connection: ConnectionGene,
        fitter: &Genome,
        weaker: &Genome,
        config: &GeneticConfig,
    ) {
        let (source, target) = connection.endpoints();
        if self.node_pairings.contains(&(source, target)) {
            return;
        }
        for id in [source, target] {
            if self.nodes.contains_key(&id) {
                continue;
            }
            let parent_node = fitter
                .nodes
                .get(&id)
                .or_else(|| weaker.nodes.get(&id))
                .unwrap_or_else(|| panic!("inherited connection {} references missing node {}", connection, id));
            self.add_node(id, parent_node.activation_type())
                .set_bias(parent_node.bias());
        }

        if connection.enabled() && !config.allow_recurrence && self.creates_cycle(source, target) {
            connection.set_enabled(false);
        }
        let enabled = connection.enabled();
        self.add_connection(connection.marker(), source, target, connection.weight())
            .set_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{ActivationType, InnovationRegistry, Mutation, Mutator};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::num::NonZeroUsize;

    fn config() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(1).unwrap(),
            disabled_inheritance_chance: 0.75,
            ..GeneticConfig::zero()
        }
    }

    /// Parents sharing markers 1, 2 and 3, with marker 4 only in
    /// the first and marker 5 only in the second.
    fn parents() -> (Genome, Genome) {
        let config = config();
        let mut a = Genome::unconnected(&config);
        let mut b = Genome::unconnected(&config);
        for genome in [&mut a, &mut b] {
            genome.add_node(3, ActivationType::Sigmoid);
            genome.add_connection(1, 0, 3, 1.0);
            genome.add_connection(2, 3, 2, 1.0);
            genome.add_connection(3, 1, 2, 1.0);
        }
        a.add_connection(4, 0, 2, 0.5);
        b.add_node(4, ActivationType::Tanh);
        b.add_connection(5, 1, 4, 0.5);
        (a, b)
    }

    fn markers(genome: &Genome) -> BTreeSet<Innovation> {
        genome.connections().map(|c| c.marker()).collect()
    }

    #[test]
    fn unmatched_genes_from_fitter_parent() {
        let (mut a, mut b) = parents();
        a.set_fitness(2.0);
        b.set_fitness(1.0);
        let mut rng = rand::thread_rng();

        for _ in 0..50 {
            for child in [
                Crossover.recombine(&a, &b, &config(), &mut rng),
                Crossover.recombine(&b, &a, &config(), &mut rng),
            ] {
                assert_eq!(markers(&child), BTreeSet::from([1, 2, 3, 4]));
                assert!(child.node(4).is_none());
                child.check_integrity();
            }
        }
    }

    #[test]
    fn equal_fitness_picks_one_parent() {
        let (mut a, mut b) = parents();
        a.set_fitness(1.0);
        b.set_fitness(1.0);
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen_4 = false;
        let mut seen_5 = false;
        for _ in 0..200 {
            let child = Crossover.recombine(&a, &b, &config(), &mut rng);
            let child_markers = markers(&child);
            assert!(child_markers.is_superset(&BTreeSet::from([1, 2, 3])));
            assert!(!(child_markers.contains(&4) && child_markers.contains(&5)));
            seen_4 |= child_markers.contains(&4);
            seen_5 |= child_markers.contains(&5);
            if child_markers.contains(&5) {
                assert_eq!(child.node(4).unwrap().activation_type(), ActivationType::Tanh);
            } else {
                assert!(child.node(4).is_none());
            }
            child.check_integrity();
        }
        assert!(seen_4 && seen_5);
    }

    #[test]
    fn biases_from_fitter_parent() {
        let (mut a, mut b) = parents();
        for (genome, bias) in [(&mut a, 0.5), (&mut b, -0.5)] {
            genome.nodes.get_mut(&2).unwrap().set_bias(bias);
            genome.nodes.get_mut(&3).unwrap().set_bias(bias);
        }
        a.set_fitness(1.0);
        b.set_fitness(2.0);
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let child = Crossover.recombine(&a, &b, &config(), &mut rng);
            assert_eq!(child.node(2).unwrap().bias(), -0.5);
            assert_eq!(child.node(3).unwrap().bias(), -0.5);
            assert_eq!(child.node(0).unwrap().bias(), 0.0);
        }
    }

    #[test]
    fn disabled_in_both_stays_disabled() {
        let (mut a, mut b) = parents();
        a.connections.get_mut(&3).unwrap().set_enabled(false);
        b.connections.get_mut(&3).unwrap().set_enabled(false);
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let child = Crossover.recombine(&a, &b, &config(), &mut rng);
            assert!(!child.connection(3).unwrap().enabled());
        }
    }

    #[test]
    fn disabled_in_one_parent_inheritance_chance() {
        let (mut a, b) = parents();
        a.connections.get_mut(&3).unwrap().set_enabled(false);
        let always = GeneticConfig {
            disabled_inheritance_chance: 1.0,
            ..config()
        };
        let never = GeneticConfig {
            disabled_inheritance_chance: 0.0,
            ..config()
        };
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            assert!(!Crossover.recombine(&a, &b, &always, &mut rng).connection(3).unwrap().enabled());
            assert!(Crossover.recombine(&a, &b, &never, &mut rng).connection(3).unwrap().enabled());
        }
    }

    #[test]
    fn inherited_cycle_is_disabled() {
        let config = config();
        let mut a = Genome::unconnected(&config);
        a.add_node(3, ActivationType::Sigmoid);
        a.add_connection(0, 0, 3, 1.0);
        a.add_connection(1, 3, 2, 1.0);
        let mut b = a.clone();
        a.add_connection(2, 2, 3, 1.0).set_enabled(false);
        b.connections.get_mut(&1).unwrap().set_enabled(false);
        b.add_connection(2, 2, 3, 1.0);

        // Whichever way marker 1 is inherited, marker 2 may not
        // be enabled while it is.
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let child = Crossover.recombine(&a, &b, &config, &mut rng);
            assert!(!child.has_cycle());
            child.check_integrity();
        }
    }

    #[test]
    fn asexual_copy() {
        let (mut a, _) = parents();
        a.set_fitness(1.0);
        let child = Crossover.recombine(&a, &a, &config(), &mut rand::thread_rng());
        assert_eq!(markers(&child), markers(&a));
        assert_eq!(child.shape(), a.shape());
    }

    #[test]
    fn randomized_sequences_keep_integrity() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(3).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            initial_connections: 2,
            hidden_activation_types: vec![ActivationType::Sigmoid, ActivationType::ReLU],
            weight_init_range: 1.0,
            weight_bound: 5.0,
            weight_perturb_power: 0.5,
            weight_mutation_chance: 0.8,
            weight_replace_chance: 0.1,
            add_connection_chance: 0.4,
            add_node_chance: 0.2,
            toggle_enable_chance: 0.05,
            max_add_connection_attempts: 10,
            disabled_inheritance_chance: 0.75,
            ..GeneticConfig::zero()
        };
        let mut rng = StdRng::seed_from_u64(1234);
        let mut registry = InnovationRegistry::new(3, 2);
        let mut pool: Vec<Genome> = (0..8)
            .map(|_| Genome::new(&mut rng, &mut registry, &config))
            .collect();

        for step in 0..1500 {
            let i = rng.gen_range(0..pool.len());
            let j = rng.gen_range(0..pool.len());
            pool[i].set_fitness(rng.gen_range(0.0..3.0));
            pool[j].set_fitness(rng.gen_range(0.0..3.0));
            let mut child = Crossover.recombine(&pool[i], &pool[j], &config, &mut rng);
            Mutation.mutate(&mut child, &mut registry, &config, &mut rng);
            child.check_conforms_to(&config);
            pool[step % 8] = child;
        }
    }
}
