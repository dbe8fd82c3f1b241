use super::{PopulationConfig, Selector, Species};
use crate::genomics::{GeneticConfig, Genome, InnovationRegistry, Mutator, Recombiner};

use rand::seq::SliceRandom;
use rand::Rng;

/// Auxiliary type for offspring generation.
/// Handles all the tasks of generating a population's
/// offspring according to the specified configs,
/// operators and allotted offspring.
///
/// Each species' members must be contiguous in
/// `generation` and ranked by descending fitness.
pub(super) struct OffspringFactory<'a, S, R, M> {
    generation: &'a [Genome],
    species: &'a [Species],
    registry: &'a mut InnovationRegistry,
    genetic_config: &'a GeneticConfig,
    population_config: &'a PopulationConfig,
    selector: &'a S,
    recombiner: &'a R,
    mutator: &'a M,
}

impl<'a, S, R, M> OffspringFactory<'a, S, R, M>
where
    S: Selector,
    R: Recombiner,
    M: Mutator,
{
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        generation: &'a [Genome],
        species: &'a [Species],
        registry: &'a mut InnovationRegistry,
        genetic_config: &'a GeneticConfig,
        population_config: &'a PopulationConfig,
        selector: &'a S,
        recombiner: &'a R,
        mutator: &'a M,
    ) -> OffspringFactory<'a, S, R, M> {
        OffspringFactory {
            generation,
            species,
            registry,
            genetic_config,
            population_config,
            selector,
            recombiner,
            mutator,
        }
    }

    /// Generate the allotted offspring, species by species.
    pub(super) fn generate_offspring(
        &mut self,
        allotted_offspring: &[usize],
        rng: &mut impl Rng,
    ) -> Vec<Genome> {
        let mut offspring = Vec::with_capacity(allotted_offspring.iter().sum());

        for (species_index, allotted) in allotted_offspring.iter().copied().enumerate() {
            let ranked = self.ranked_members(species_index);
            if ranked.is_empty() || allotted == 0 {
                continue;
            }
            let elite = self.count_elite(allotted);
            for genome in &ranked[..elite] {
                let mut copy = genome.clone();
                copy.clear_fitness();
                offspring.push(copy);
            }
            self.add_mated_offspring(&mut offspring, ranked, allotted - elite, rng);
        }

        offspring
    }

    /// The species' champion is kept if its quota
    /// reaches the elitism threshold.
    fn count_elite(&self, allotted: usize) -> usize {
        let elitism = self.population_config.elitism;
        if elitism > 0 && allotted >= elitism {
            1
        } else {
            0
        }
    }

    fn ranked_members(&self, species_index: usize) -> &'a [Genome] {
        let members = self.species[species_index].members();
        match members.first() {
            Some(first) => &self.generation[*first..*first + members.len()],
            None => &[],
        }
    }

    /// Choose parents from the species' breeding pool and
    /// mate them, mutating and adding each child to the offspring.
    /// A parent may be chosen twice (asexual reproduction).
    fn add_mated_offspring(
        &mut self,
        offspring: &mut Vec<Genome>,
        ranked: &'a [Genome],
        count: usize,
        rng: &mut impl Rng,
    ) {
        let pool = match self.selector.select(ranked) {
            [] => &ranked[..1],
            pool => pool,
        };
        for _ in 0..count {
            let (parent1, parent2) = match (pool.choose(rng), pool.choose(rng)) {
                (Some(p1), Some(p2)) => (p1, p2),
                _ => continue,
            };
            let mut child = self
                .recombiner
                .recombine(parent1, parent2, self.genetic_config, rng);
            self.mutator
                .mutate(&mut child, self.registry, self.genetic_config, rng);
            offspring.push(child);
        }
    }
}
