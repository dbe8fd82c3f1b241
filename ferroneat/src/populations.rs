//! A Population is a collection of genomes.
//! These are grouped into species, which can
//! be evolved using a genome evaluation function
//! as the source of selective pressure.
mod config;
mod errors;
mod evaluation;
pub mod logging;
mod offspring_factory;
mod selection;
mod species;

use crate::genomics::{Crossover, GeneticConfig, Genome, InnovationRegistry, Mutation, Mutator, Recombiner};
pub use config::{PopulationConfig, RepresentativePolicy};
pub(crate) use errors::{check_non_negative, check_probability};
pub use errors::{ConfigError, EvolutionError};
pub use evaluation::Evaluation;
use logging::{GenerationReport, SpeciesReport, Stats};
use offspring_factory::OffspringFactory;
pub use selection::{EliteSelection, Selector};
use species::compare_fitness;
pub use species::{Species, SpeciesID};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// A population of genomes, and the state of
/// the run evolving them.
///
/// The population is generic over its [`Selector`],
/// [`Recombiner`] and [`Mutator`], defaulting to the
/// standard NEAT operators.
///
/// A generation goes through evaluation
/// ([`evaluate_fitness`]) and then speciation, offspring
/// allotment, breeding and replacement ([`evolve`]).
/// [`start`] repeats both until the run terminates.
///
/// [`evaluate_fitness`]: Population::evaluate_fitness
/// [`evolve`]: Population::evolve
/// [`start`]: Population::start
#[derive(Debug)]
pub struct Population<S = EliteSelection, R = Crossover, M = Mutation> {
    genomes: Vec<Genome>,
    species: Vec<Species>,
    registry: InnovationRegistry,
    generation: usize,
    best_genome: Option<Genome>,
    evaluated: bool,
    population_config: PopulationConfig,
    genetic_config: GeneticConfig,
    selector: S,
    recombiner: R,
    mutator: M,
    rng: StdRng,
}

impl Population {
    /// Creates a new population using the passed configurations,
    /// and the standard NEAT operators.
    ///
    /// # Errors
    /// Returns an error if either configuration is invalid.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::{Population, PopulationConfig};
    /// use ferroneat::genomics::GeneticConfig;
    /// use std::num::NonZeroUsize;
    ///
    /// let population = Population::new(
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(30).unwrap(),
    ///         ..PopulationConfig::default()
    ///     },
    ///     GeneticConfig::default(),
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(population.genomes().len(), 30);
    /// assert_eq!(population.generation(), 0);
    /// ```
    pub fn new(
        population_config: PopulationConfig,
        genetic_config: GeneticConfig,
    ) -> Result<Population, ConfigError> {
        let selector = EliteSelection {
            survival_fraction: population_config.survival_fraction,
        };
        Population::with_operators(population_config, genetic_config, selector, Crossover, Mutation)
    }
}

impl<S, R, M> Population<S, R, M>
where
    S: Selector,
    R: Recombiner,
    M: Mutator,
{
    /// Creates a new population using the passed
    /// configurations and operators.
    ///
    /// # Errors
    /// Returns an error if either configuration is invalid.
    pub fn with_operators(
        population_config: PopulationConfig,
        genetic_config: GeneticConfig,
        selector: S,
        recombiner: R,
        mutator: M,
    ) -> Result<Population<S, R, M>, ConfigError> {
        population_config.validate()?;
        genetic_config.validate()?;

        let rng = match population_config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut population = Population {
            genomes: vec![],
            species: vec![],
            registry: InnovationRegistry::new(
                genetic_config.input_count.get(),
                genetic_config.output_count.get(),
            ),
            generation: 0,
            best_genome: None,
            evaluated: false,
            population_config,
            genetic_config,
            selector,
            recombiner,
            mutator,
            rng,
        };
        population.seed_genomes();
        Ok(population)
    }

    fn seed_genomes(&mut self) {
        self.genomes = (0..self.population_config.size.get())
            .map(|_| Genome::new(&mut self.rng, &mut self.registry, &self.genetic_config))
            .collect();
    }

    /// Evaluates the fitness of each genome in the
    /// population using the passed evaluator, and the
    /// configured [`Evaluation`] strategy.
    ///
    /// Fitness may be negative; larger is better.
    ///
    /// # Errors
    /// Returns an error, and leaves every genome's fitness
    /// untouched, if the evaluator returns NaN or an infinity.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::{Population, PopulationConfig};
    /// use ferroneat::genomics::{GeneticConfig, Genome};
    ///
    /// let mut population = Population::new(PopulationConfig::default(), GeneticConfig::default()).unwrap();
    ///
    /// population
    ///     .evaluate_fitness(&|g: &Genome| -(g.connections().count() as f32))
    ///     .unwrap();
    ///
    /// assert!(population.genomes().iter().all(|g| g.fitness().is_some()));
    /// ```
    pub fn evaluate_fitness<F>(&mut self, fitness: &F) -> Result<(), EvolutionError>
    where
        F: Fn(&Genome) -> f32 + Sync,
    {
        let scores = self
            .population_config
            .evaluation
            .evaluate(&self.genomes, fitness);

        if let Some((genome_index, value)) = scores
            .iter()
            .copied()
            .enumerate()
            .find(|(_, score)| !score.is_finite())
        {
            return Err(EvolutionError::NonFiniteFitness { genome_index, value });
        }

        for (genome, score) in self.genomes.iter_mut().zip(scores) {
            genome.set_fitness(score);
        }
        if let Some(champion) = self.champion() {
            let improved = match &self.best_genome {
                Some(best) => compare_fitness(champion, best).is_gt(),
                None => true,
            };
            if improved {
                self.best_genome = Some(champion.clone());
            }
        }
        self.evaluated = true;
        Ok(())
    }

    /// Evolves the evaluated population into the next generation:
    /// genomes are speciated, stale species are removed, offspring
    /// are allotted to species by adjusted fitness, and bred
    /// through selection, crossover and mutation.
    ///
    /// Returns a report on the generation that was evolved.
    ///
    /// # Errors
    /// Returns an error if the current generation
    /// has not been evaluated.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::{Population, PopulationConfig};
    /// use ferroneat::genomics::{GeneticConfig, Genome};
    ///
    /// let mut population = Population::new(PopulationConfig::default(), GeneticConfig::default()).unwrap();
    ///
    /// // Evolution requires evaluated genomes.
    /// assert!(population.evolve().is_err());
    ///
    /// population.evaluate_fitness(&|_: &Genome| 1.0).unwrap();
    /// let report = population.evolve().unwrap();
    ///
    /// assert_eq!(report.generation, 0);
    /// assert_eq!(population.generation(), 1);
    /// assert_eq!(population.genomes().len(), 150);
    /// ```
    pub fn evolve(&mut self) -> Result<GenerationReport, EvolutionError> {
        if !self.evaluated || self.genomes.iter().any(|g| g.fitness().is_none()) {
            return Err(EvolutionError::Unevaluated);
        }

        self.speciate();
        for species in &mut self.species {
            species.update_fitness(&self.genomes);
        }
        let removed_species = self.remove_stale_species();
        let allotted_offspring = allot_offspring(
            &self.species,
            &self.genomes,
            self.population_config.size.get(),
        );
        for (species, offspring) in self.species.iter().zip(&allotted_offspring) {
            log::debug!(
                "species {:?}: {} members, {} offspring",
                species.id(),
                species.len(),
                offspring
            );
        }

        let report = self.report(&allotted_offspring, removed_species);
        log::info!(
            "generation {}: best fitness {:.4}, {} species",
            report.generation,
            report.best_fitness,
            report.species.len()
        );

        let allotted_offspring = self.remove_barren_species(allotted_offspring);
        self.choose_representatives();
        self.group_species_members();
        let offspring = OffspringFactory::new(
            &self.genomes,
            &self.species,
            &mut self.registry,
            &self.genetic_config,
            &self.population_config,
            &self.selector,
            &self.recombiner,
            &self.mutator,
        )
        .generate_offspring(&allotted_offspring, &mut self.rng);
        self.genomes = offspring;
        for species in &mut self.species {
            species.clear_members();
        }

        self.generation += 1;
        self.evaluated = false;
        Ok(report)
    }

    /// Assigns each genome, in population order, to the first
    /// species whose representative is closer than the
    /// [distance threshold], founding a new species otherwise.
    /// Species left without members are removed.
    ///
    /// Representatives are not changed, so speciating an
    /// unchanged population again yields the same partition.
    ///
    /// [distance threshold]: PopulationConfig::distance_threshold
    pub fn speciate(&mut self) {
        for species in &mut self.species {
            species.clear_members();
        }

        let mut born = 0;
        for (index, genome) in self.genomes.iter().enumerate() {
            let threshold = self.population_config.distance_threshold;
            let config = &self.genetic_config;
            match self
                .species
                .iter_mut()
                .find(|s| s.genetic_distance(genome, config) < threshold)
            {
                Some(species) => species.add_member(index),
                None => {
                    let id = SpeciesID(self.generation, born);
                    let mut species = Species::new(id, genome.clone());
                    species.add_member(index);
                    self.species.push(species);
                    born += 1;
                    log::debug!("species {:?} born", id);
                }
            }
        }

        self.species.retain(|s| {
            if s.is_empty() {
                log::debug!("species {:?} went extinct", s.id());
            }
            !s.is_empty()
        });
    }

    /// Removes species stale for longer than the [stagnation limit],
    /// except the species holding the generation's best genome.
    ///
    /// [stagnation limit]: PopulationConfig::stagnation_limit
    fn remove_stale_species(&mut self) -> Vec<SpeciesID> {
        let limit = self.population_config.stagnation_limit;
        if limit == 0 {
            return vec![];
        }
        let champion_index = (0..self.genomes.len())
            .max_by(|a, b| compare_fitness(&self.genomes[*a], &self.genomes[*b]));

        let mut removed = vec![];
        self.species.retain(|s| {
            let stale = s.staleness() >= limit
                && !champion_index.map_or(false, |i| s.members().contains(&i));
            if stale {
                log::warn!(
                    "species {:?} removed after {} generations without improvement",
                    s.id(),
                    s.staleness()
                );
                removed.push(s.id());
            }
            !stale
        });
        removed
    }

    /// Removes species allotted no offspring, returning
    /// the allotments of the remaining species.
    fn remove_barren_species(&mut self, allotted_offspring: Vec<usize>) -> Vec<usize> {
        let (species, allotted_offspring): (Vec<_>, Vec<_>) = std::mem::take(&mut self.species)
            .into_iter()
            .zip(allotted_offspring)
            .filter(|(species, offspring)| {
                if *offspring == 0 {
                    log::debug!("species {:?} went extinct with no offspring", species.id());
                }
                *offspring > 0
            })
            .unzip();
        self.species = species;
        allotted_offspring
    }

    fn choose_representatives(&mut self) {
        for species in &mut self.species {
            species.choose_representative(
                self.population_config.representative_policy,
                &self.genomes,
                &self.genetic_config,
                &mut self.rng,
            );
        }
    }

    /// Reorders the generation so that each species' members are
    /// contiguous and ranked by descending fitness. Genomes of
    /// removed species are dropped.
    fn group_species_members(&mut self) {
        for species in &mut self.species {
            species.rank_members(&self.genomes);
        }
        let mut slots: Vec<Option<Genome>> = std::mem::take(&mut self.genomes)
            .into_iter()
            .map(Some)
            .collect();

        for species in &mut self.species {
            let start = self.genomes.len();
            for index in &species.members {
                if let Some(genome) = slots[*index].take() {
                    self.genomes.push(genome);
                }
            }
            species.members = (start..self.genomes.len()).collect();
        }
    }

    fn report(&self, allotted_offspring: &[usize], removed_species: Vec<SpeciesID>) -> GenerationReport {
        let scores = self.genomes.iter().map(Genome::ranking_fitness);
        let fitness = Stats::from(scores).unwrap_or(Stats {
            maximum: f32::NAN,
            minimum: f32::NAN,
            mean: f32::NAN,
            median: f32::NAN,
        });
        let species = self
            .species
            .iter()
            .zip(allotted_offspring)
            .map(|(s, offspring)| {
                let champion = s.champion(&self.genomes);
                SpeciesReport {
                    id: s.id(),
                    member_count: s.len(),
                    mean_fitness: s.adjusted_fitness() as f32,
                    best_fitness: champion.map_or(f32::NAN, Genome::ranking_fitness),
                    best_shape: champion.map_or((0, 0), Genome::shape),
                    staleness: s.staleness(),
                    offspring: *offspring,
                }
            })
            .collect();

        GenerationReport {
            generation: self.generation,
            best_fitness: fitness.maximum,
            best_fitness_ever: self
                .best_genome
                .as_ref()
                .map_or(fitness.maximum, Genome::ranking_fitness),
            fitness,
            species,
            removed_species,
        }
    }

    /// Runs evaluation and evolution until the best fitness
    /// reaches the [fitness threshold], or [`max_generations`]
    /// generations have passed. `callback` receives the report
    /// of every generation.
    ///
    /// Returns the best genome seen during the run.
    ///
    /// # Errors
    /// Returns an error if the fitness function returns NaN
    /// or an infinity.
    ///
    /// [fitness threshold]: PopulationConfig::fitness_threshold
    /// [`max_generations`]: PopulationConfig::max_generations
    ///
    /// # Examples
    /// ```
    /// use ferroneat::{Population, PopulationConfig};
    /// use ferroneat::genomics::{GeneticConfig, Genome};
    /// use std::num::NonZeroUsize;
    ///
    /// let mut population = Population::new(
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(20).unwrap(),
    ///         max_generations: 5,
    ///         seed: Some(42),
    ///         ..PopulationConfig::default()
    ///     },
    ///     GeneticConfig::default(),
    /// )
    /// .unwrap();
    ///
    /// let mut generations = 0;
    /// let best = population
    ///     .start(&|g: &Genome| g.shape().1 as f32, &mut |_| generations += 1)
    ///     .unwrap();
    ///
    /// assert_eq!(generations, 5);
    /// assert!(best.fitness().is_some());
    /// ```
    pub fn start<F, C>(&mut self, fitness: &F, callback: &mut C) -> Result<Genome, EvolutionError>
    where
        F: Fn(&Genome) -> f32 + Sync,
        C: FnMut(&GenerationReport),
    {
        loop {
            self.evaluate_fitness(fitness)?;
            let report = self.evolve()?;
            callback(&report);
            if self.is_finished() {
                break;
            }
        }
        self.best_genome.clone().ok_or(EvolutionError::Unevaluated)
    }

    /// Returns whether the run has met a termination condition.
    pub fn is_finished(&self) -> bool {
        let threshold_met = match (self.population_config.fitness_threshold, &self.best_genome) {
            (Some(threshold), Some(best)) => best.ranking_fitness() >= threshold,
            _ => false,
        };
        threshold_met || self.generation >= self.population_config.max_generations
    }

    /// Resets the population to an initial randomized state,
    /// with a fresh innovation registry. The random number
    /// generator is not reseeded.
    pub fn reset(&mut self) {
        self.registry = InnovationRegistry::new(
            self.genetic_config.input_count.get(),
            self.genetic_config.output_count.get(),
        );
        self.species.clear();
        self.generation = 0;
        self.best_genome = None;
        self.evaluated = false;
        self.seed_genomes();
    }

    /// Returns the currently best-performing genome,
    /// or `None` if the generation is unevaluated.
    pub fn champion(&self) -> Option<&Genome> {
        self.genomes
            .iter()
            .filter(|g| g.fitness().is_some())
            .max_by(|a, b| compare_fitness(a, b))
    }

    /// Returns the best genome evaluated so far in the run.
    pub fn best_genome(&self) -> Option<&Genome> {
        self.best_genome.as_ref()
    }

    /// Returns the current generation's genomes.
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// Returns an iterator over all current species.
    ///
    /// Species membership is only populated between
    /// [`speciate`] and the end of [`evolve`].
    ///
    /// [`speciate`]: Population::speciate
    /// [`evolve`]: Population::evolve
    pub fn species(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the population's innovation registry.
    pub fn registry(&self) -> &InnovationRegistry {
        &self.registry
    }

    /// Returns the population's configuration.
    pub fn population_config(&self) -> &PopulationConfig {
        &self.population_config
    }

    /// Returns the genetic configuration.
    pub fn genetic_config(&self) -> &GeneticConfig {
        &self.genetic_config
    }
}

/// Allots the number of offspring for each species.
///
/// Each member's adjusted fitness is its fitness divided by its
/// species' size. Since fitness may be negative, shares are
/// shifted so that the lowest adjusted fitness counts as 1:
/// a species' share is `Σ(adjusted - shift)`, with
/// `shift = min(adjusted) - 1`. Quotas are proportional to
/// shares, rounded by largest remainder, and sum to `size`.
fn allot_offspring(species: &[Species], generation: &[Genome], size: usize) -> Vec<usize> {
    let adjusted = |s: &Species, g: &Genome| g.ranking_fitness() as f64 / s.len().max(1) as f64;
    let min_adjusted = species
        .iter()
        .flat_map(|s| s.genomes(generation).map(move |g| adjusted(s, g)))
        .fold(f64::INFINITY, f64::min);
    if !min_adjusted.is_finite() {
        return vec![0; species.len()];
    }
    let shift = min_adjusted - 1.0;

    let shares: Vec<f64> = species
        .iter()
        .map(|s| s.genomes(generation).map(|g| adjusted(s, g) - shift).sum())
        .collect();
    let total: f64 = shares.iter().sum();
    let proportional: Vec<f64> = shares.iter().map(|s| s / total * size as f64).collect();
    round_retain_sum(&proportional, size)
}

/// Rounds all values to whole numbers summing to `total`,
/// by the largest remainder method: values are floored, and
/// the remaining units go to the largest fractional parts,
/// ties going to the lower index.
fn round_retain_sum(values: &[f64], total: usize) -> Vec<usize> {
    if values.is_empty() {
        return vec![];
    }
    let mut rounded: Vec<usize> = values.iter().map(|v| v.max(0.0).floor() as usize).collect();
    let mut by_remainder: Vec<usize> = (0..values.len()).collect();
    by_remainder.sort_by(|a, b| {
        let ra = values[*a] - values[*a].floor();
        let rb = values[*b] - values[*b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(b))
    });

    let mut sum: usize = rounded.iter().sum();
    let mut cursor = by_remainder.iter().cycle();
    while sum < total {
        if let Some(i) = cursor.next() {
            rounded[*i] += 1;
            sum += 1;
        }
    }
    // Floating point error may only overshoot by a few units.
    let mut cursor = by_remainder.iter().rev().cycle();
    while sum > total {
        if let Some(i) = cursor.next() {
            if rounded[*i] > 0 {
                rounded[*i] -= 1;
                sum -= 1;
            }
        }
    }
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::ActivationType;
    use std::num::NonZeroUsize;

    fn genome_with_fitness(fitness: f32) -> Genome {
        let mut genome = Genome::unconnected(&GeneticConfig::zero());
        genome.set_fitness(fitness);
        genome
    }

    fn species_with(id: usize, members: std::ops::Range<usize>, generation: &[Genome]) -> Species {
        let mut species = Species::new(SpeciesID(0, id), generation[members.start].clone());
        for i in members {
            species.add_member(i);
        }
        species
    }

    #[test]
    fn round_retain_sum() {
        let v = [5.2, 9.5, 2.8, 1.3, 2.2, 2.7, 6.3, 1.0000000000001, 0.9999999999999];
        let w = super::round_retain_sum(&v, 32);
        assert_eq!(w.iter().sum::<usize>(), 32);
        assert_eq!(w, [5, 10, 3, 1, 2, 3, 6, 1, 1]);
    }

    #[test]
    fn round_retain_sum_ties_to_lower_index() {
        assert_eq!(super::round_retain_sum(&[1.5, 1.5, 1.0], 4), [2, 1, 1]);
        assert_eq!(super::round_retain_sum(&[1.0 / 3.0; 3], 1), [1, 0, 0]);
    }

    #[test]
    fn quotas_sum_to_size() {
        for fitnesses in [
            vec![0.0; 12],
            vec![7.5; 12],
            vec![-3.0, 1.0, 4.0, -1.0, 5.0, 9.0, -2.0, 6.0, 5.0, 3.0, 5.0, -8.0],
            vec![1e6, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 1e-3, 7.0, 0.5, 0.25, 0.125],
        ] {
            let generation: Vec<Genome> = fitnesses.iter().map(|f| genome_with_fitness(*f)).collect();
            let species = vec![
                species_with(0, 0..5, &generation),
                species_with(1, 5..6, &generation),
                species_with(2, 6..12, &generation),
            ];
            for size in [1, 10, 12, 150] {
                let quotas = allot_offspring(&species, &generation, size);
                assert_eq!(quotas.iter().sum::<usize>(), size, "{:?}", fitnesses);
            }
        }
    }

    #[test]
    fn equal_fitness_allots_by_size() {
        let generation: Vec<Genome> = (0..10).map(|_| genome_with_fitness(0.0)).collect();
        let species = vec![
            species_with(0, 0..6, &generation),
            species_with(1, 6..10, &generation),
        ];
        assert_eq!(allot_offspring(&species, &generation, 10), [6, 4]);
    }

    fn small_config(size: usize) -> (PopulationConfig, GeneticConfig) {
        (
            PopulationConfig {
                size: NonZeroUsize::new(size).unwrap(),
                distance_threshold: 1.0,
                elitism: 1,
                survival_fraction: 0.5,
                stagnation_limit: 3,
                max_generations: 10,
                seed: Some(7),
                ..PopulationConfig::zero()
            },
            GeneticConfig {
                input_count: NonZeroUsize::new(2).unwrap(),
                initial_connections: 2,
                ..GeneticConfig::default()
            },
        )
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (mut population_config, genetic_config) = small_config(10);
        population_config.distance_threshold = -1.0;
        assert!(matches!(
            Population::new(population_config, genetic_config),
            Err(ConfigError::NonPositive { name: "distance_threshold", .. })
        ));
    }

    #[test]
    fn non_finite_fitness_is_an_error() {
        let (population_config, genetic_config) = small_config(10);
        let mut population = Population::new(population_config, genetic_config).unwrap();
        let error = population.evaluate_fitness(&|_: &Genome| f32::NAN).unwrap_err();
        assert!(matches!(error, EvolutionError::NonFiniteFitness { genome_index: 0, .. }));
        assert!(population.genomes().iter().all(|g| g.fitness().is_none()));
        assert_eq!(population.evolve(), Err(EvolutionError::Unevaluated));
    }

    #[test]
    fn speciation_is_idempotent() {
        let (population_config, genetic_config) = small_config(30);
        let mut population = Population::new(population_config, genetic_config).unwrap();
        population.evaluate_fitness(&|g: &Genome| g.shape().1 as f32).unwrap();
        population.evolve().unwrap();
        population.evaluate_fitness(&|g: &Genome| g.shape().1 as f32).unwrap();

        population.speciate();
        let first: Vec<(SpeciesID, Vec<usize>)> = population
            .species()
            .map(|s| (s.id(), s.members().to_vec()))
            .collect();
        population.speciate();
        let second: Vec<(SpeciesID, Vec<usize>)> = population
            .species()
            .map(|s| (s.id(), s.members().to_vec()))
            .collect();

        assert_eq!(first, second);
        assert_eq!(first.iter().map(|(_, m)| m.len()).sum::<usize>(), 30);
    }

    #[test]
    fn stale_species_are_removed() {
        let (population_config, genetic_config) = small_config(4);
        let mut population = Population::new(population_config, genetic_config).unwrap();
        population.genomes = (0..4).map(|i| genome_with_fitness(i as f32)).collect();

        let mut stale = species_with(0, 0..2, &population.genomes);
        let mut best = species_with(1, 2..4, &population.genomes);
        for _ in 0..4 {
            stale.update_fitness(&population.genomes);
            best.update_fitness(&population.genomes);
        }
        assert_eq!(stale.staleness(), 3);
        assert_eq!(best.staleness(), 3);
        population.species = vec![stale, best];

        // Only the species holding the best genome survives.
        assert_eq!(population.remove_stale_species(), vec![SpeciesID(0, 0)]);
        assert_eq!(population.species().count(), 1);
    }

    #[test]
    fn stale_singleton_species_is_removed() {
        let (population_config, genetic_config) = small_config(3);
        let mut population = Population::new(population_config, genetic_config).unwrap();
        population.genomes = [0.0, 1.0, 5.0].into_iter().map(genome_with_fitness).collect();

        let mut stale = species_with(0, 0..1, &population.genomes);
        let mut fresh = species_with(1, 1..2, &population.genomes);
        let mut champion = species_with(2, 2..3, &population.genomes);
        for _ in 0..4 {
            stale.update_fitness(&population.genomes);
            champion.update_fitness(&population.genomes);
        }
        fresh.update_fitness(&population.genomes);
        assert_eq!(stale.staleness(), 3);
        assert_eq!(fresh.staleness(), 0);
        population.species = vec![stale, fresh, champion];

        assert_eq!(population.remove_stale_species(), vec![SpeciesID(0, 0)]);
        let remaining: Vec<SpeciesID> = population.species().map(|s| s.id()).collect();
        assert_eq!(remaining, vec![SpeciesID(0, 1), SpeciesID(0, 2)]);
    }

    #[test]
    fn species_without_offspring_are_removed() {
        let (mut population_config, genetic_config) = small_config(10);
        population_config.distance_threshold = 0.1;
        let mut population = Population::new(population_config, genetic_config.clone()).unwrap();
        let connected = population.genomes[0].clone();
        assert!(connected.connections().count() > 0);
        population.genomes = std::iter::once(connected)
            .chain((0..9).map(|_| Genome::unconnected(&genetic_config)))
            .collect();
        let fitness = |g: &Genome| {
            if g.connections().count() > 0 {
                -1000.0
            } else {
                1000.0
            }
        };

        population.evaluate_fitness(&fitness).unwrap();
        let report = population.evolve().unwrap();
        assert_eq!(report.species[0].id, SpeciesID(0, 0));
        assert_eq!(report.species[0].offspring, 0);
        assert!(population.species().all(|s| s.id() != SpeciesID(0, 0)));
        assert_eq!(population.genomes().len(), 10);

        population.evaluate_fitness(&fitness).unwrap();
        population.speciate();
        assert!(population.species().all(|s| s.id() != SpeciesID(0, 0)));
        assert_eq!(population.species().map(Species::len).sum::<usize>(), 10);
    }

    #[test]
    fn size_preserved() {
        let (population_config, genetic_config) = small_config(25);
        let mut population = Population::new(population_config, genetic_config).unwrap();
        for _ in 0..5 {
            population
                .evaluate_fitness(&|g: &Genome| g.connections().map(|c| c.weight()).sum::<f32>())
                .unwrap();
            let best = population.champion().cloned().unwrap();
            let report = population.evolve().unwrap();

            assert_eq!(population.genomes().len(), 25);
            assert_eq!(report.species.iter().map(|s| s.offspring).sum::<usize>(), 25);
            assert!(report.species.iter().map(|s| s.member_count).sum::<usize>() <= 25);
            assert!(report.best_fitness <= best.fitness().unwrap());
            for genome in population.genomes() {
                genome.check_conforms_to(population.genetic_config());
            }
        }
    }

    #[test]
    fn negative_connection_count_pressure() {
        let population_config = PopulationConfig {
            size: NonZeroUsize::new(10).unwrap(),
            distance_threshold: 3.0,
            elitism: 1,
            survival_fraction: 0.5,
            stagnation_limit: 15,
            max_generations: 5,
            seed: Some(2024),
            ..PopulationConfig::zero()
        };
        let genetic_config = GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(1).unwrap(),
            initial_connections: 2,
            add_connection_chance: 0.3,
            add_node_chance: 0.0,
            ..GeneticConfig::default()
        };
        let mut population = Population::new(population_config, genetic_config).unwrap();
        let average_connections = |p: &Population| {
            p.genomes().iter().map(|g| g.connections().count()).sum::<usize>() as f32
                / p.genomes().len() as f32
        };

        let initial = average_connections(&population);
        let best = population
            .start(&|g: &Genome| -(g.connections().count() as f32), &mut |_| {})
            .unwrap();

        assert_eq!(population.generation(), 5);
        assert!(average_connections(&population) <= initial);
        assert!(best.fitness().unwrap() >= -2.0);
    }

    #[test]
    fn fitness_threshold_terminates() {
        let (mut population_config, genetic_config) = small_config(10);
        population_config.fitness_threshold = Some(0.5);
        population_config.max_generations = 100;
        let mut population = Population::new(population_config, genetic_config).unwrap();
        let best = population.start(&|_: &Genome| 1.0, &mut |_| {}).unwrap();
        assert_eq!(population.generation(), 1);
        assert_eq!(best.fitness(), Some(1.0));
    }

    #[test]
    fn custom_operators() {
        struct Asexual;
        impl Recombiner for Asexual {
            fn recombine(
                &self,
                first: &Genome,
                _: &Genome,
                _: &GeneticConfig,
                _: &mut impl rand::Rng,
            ) -> Genome {
                let mut child = first.clone();
                child.clear_fitness();
                child
            }
        }
        struct AddNodes;
        impl Mutator for AddNodes {
            fn mutate(
                &self,
                genome: &mut Genome,
                registry: &mut InnovationRegistry,
                config: &GeneticConfig,
                rng: &mut impl rand::Rng,
            ) {
                genome.mutate_add_node(rng, registry, config);
            }
        }

        let (population_config, mut genetic_config) = small_config(10);
        genetic_config.hidden_activation_types = vec![ActivationType::Tanh];
        let mut population = Population::with_operators(
            population_config,
            genetic_config,
            EliteSelection { survival_fraction: 1.0 },
            Asexual,
            AddNodes,
        )
        .unwrap();
        population.evaluate_fitness(&|_: &Genome| 0.0).unwrap();
        population.evolve().unwrap();

        // Every non-elite child gained a hidden node.
        assert!(population.genomes().iter().any(|g| g
            .nodes()
            .any(|n| n.activation_type() == ActivationType::Tanh)));
    }
}
