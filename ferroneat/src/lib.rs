//! An implementation of NeuroEvolution of Augmenting Topologies,
//! following the 2002 paper: <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! Genomes encode neural networks as node and connection genes,
//! tagged with historical markers so that structurally different
//! genomes can be aligned for crossover and compared for speciation.
//! Populations evolve weights and topology together, protecting
//! new structure by sharing fitness within species.
//!
//! The crate is split into three modules:
//! - [`genomics`]: genomes, their mutation and crossover, and the
//!   innovation registry handing out historical markers.
//! - [`networks`]: feed-forward and recurrent networks built from genomes,
//!   for use in fitness functions.
//! - [`populations`]: speciation, offspring allotment and the generational loop.
//!
//! # Example usage: Evolution of an XOR function approximator
//! ```
//! use ferroneat::genomics::{ActivationType, GeneticConfig, Genome};
//! use ferroneat::networks::FeedForwardNetwork;
//! use ferroneat::{Evaluation, Population, PopulationConfig};
//! use std::num::NonZeroUsize;
//!
//! fn evaluate_xor(genome: &Genome) -> f32 {
//!     let mut network = FeedForwardNetwork::new(genome);
//!
//!     let values = [
//!         ([0.0, 0.0], 0.0),
//!         ([0.0, 1.0], 1.0),
//!         ([1.0, 0.0], 1.0),
//!         ([1.0, 1.0], 0.0),
//!     ];
//!
//!     let error: f32 = values
//!         .iter()
//!         .map(|(input, output)| (network.activate(input)[0] - output).abs())
//!         .sum();
//!     (4.0 - error).powf(2.0)
//! }
//!
//! let genetic_config = GeneticConfig {
//!     input_count: NonZeroUsize::new(2).unwrap(),
//!     output_count: NonZeroUsize::new(1).unwrap(),
//!     initial_connections: 2,
//!     hidden_activation_types: vec![ActivationType::Sigmoid],
//!     output_activation_types: vec![ActivationType::Sigmoid],
//!     ..GeneticConfig::default()
//! };
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(150).unwrap(),
//!     max_generations: 10,
//!     fitness_threshold: Some(15.0),
//!     evaluation: Evaluation::Parallel,
//!     ..PopulationConfig::default()
//! };
//!
//! let mut population = Population::new(population_config, genetic_config).unwrap();
//! let best = population
//!     .start(&evaluate_xor, &mut |report| println!("{}", report))
//!     .unwrap();
//!
//! assert!(best.fitness().unwrap() > 0.0);
//! ```
pub mod genomics;
pub mod networks;
pub mod populations;

use genomics::{GeneticConfig, Genome};
pub use populations::*;

use std::num::NonZeroUsize;

/// Historical marker of a connection gene, or id of a node gene.
pub type Innovation = usize;

/// Runs a full evolution with the default configurations,
/// and returns the best genome found.
///
/// Genomes have `shape.0` inputs and `shape.1` outputs, and
/// start with `initial_connections` random input→output
/// connections. The run stops once the best fitness reaches
/// `fitness_threshold`, or after `max_generations` generations.
///
/// # Errors
/// Returns an error if `size` or either count in `shape` is zero,
/// or if `fitness` returns NaN or an infinity.
///
/// # Examples
/// ```
/// use ferroneat::genomics::Genome;
///
/// // Reward genomes with fewer connections.
/// let best = ferroneat::start(20, (2, 1), 5, None, 2, &|g: &Genome| {
///     -(g.connections().filter(|c| c.enabled()).count() as f32)
/// })
/// .unwrap();
/// assert!(best.fitness().unwrap() <= 0.0);
///
/// assert!(ferroneat::start(20, (0, 1), 5, None, 0, &|_: &Genome| 0.0).is_err());
/// ```
pub fn start<F>(
    size: usize,
    shape: (usize, usize),
    max_generations: usize,
    fitness_threshold: Option<f32>,
    initial_connections: usize,
    fitness: &F,
) -> Result<Genome, EvolutionError>
where
    F: Fn(&Genome) -> f32 + Sync,
{
    let size = NonZeroUsize::new(size).ok_or(ConfigError::EmptyPopulation)?;
    let input_count = NonZeroUsize::new(shape.0).ok_or(ConfigError::NoInputs)?;
    let output_count = NonZeroUsize::new(shape.1).ok_or(ConfigError::NoOutputs)?;

    let genetic_config = GeneticConfig {
        initial_connections,
        ..GeneticConfig::with_shape(input_count, output_count)
    };
    let population_config = PopulationConfig {
        size,
        max_generations,
        fitness_threshold,
        ..PopulationConfig::default()
    };

    let mut population = Population::new(population_config, genetic_config)?;
    population.start(fitness, &mut |report| {
        log::debug!("generation {} best fitness {}", report.generation, report.best_fitness)
    })
}
