use crate::genomics::{GeneticConfig, Genome};
use crate::populations::RepresentativePolicy;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::cmp::Ordering;

/// Species identifier. Specifies
/// the generation in which the species
/// was born, and the count of other species
/// born in the _same generation_ before
/// the one identified (i.e, if it was the
/// third species born in generation 5, it
/// will be species [5, 2]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesID(pub usize, pub usize);

/// Species are collections of reproductively
/// compatible (within a certain [genetic distance])
/// genomes. Membership is determined by calculating
/// the genetic distance to a _representative_,
/// chosen each generation according to the
/// [representative policy].
///
/// A species whose best fitness does not improve for
/// [`stagnation_limit`] generations is considered stale
/// and is removed from the population.
///
/// Members are stored as indices into the
/// population's current generation.
///
/// [genetic distance]: crate::PopulationConfig::distance_threshold
/// [representative policy]: crate::PopulationConfig::representative_policy
/// [`stagnation_limit`]: crate::PopulationConfig::stagnation_limit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    id: SpeciesID,
    representative: Genome,
    pub(super) members: Vec<usize>,
    staleness: usize,
    best_fitness: Option<f32>,
    adjusted_fitness: f64,
}

impl Species {
    /// Creates a new, memberless species with
    /// the specified ID and representative.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{GeneticConfig, Genome};
    /// use ferroneat::{Species, SpeciesID};
    ///
    /// let species = Species::new(SpeciesID(1, 0), Genome::unconnected(&GeneticConfig::zero()));
    ///
    /// assert_eq!(species.id(), SpeciesID(1, 0));
    /// assert!(species.is_empty());
    /// ```
    pub fn new(id: SpeciesID, representative: Genome) -> Species {
        Species {
            id,
            representative,
            members: vec![],
            staleness: 0,
            best_fitness: None,
            adjusted_fitness: 0.0,
        }
    }

    /// Returns the species' ID.
    pub fn id(&self) -> SpeciesID {
        self.id
    }

    /// Returns the species' representative.
    pub fn representative(&self) -> &Genome {
        &self.representative
    }

    /// Returns the genetic distance between the species'
    /// representative and `other`.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{GeneticConfig, Genome};
    /// use ferroneat::{Species, SpeciesID};
    ///
    /// let config = GeneticConfig::default();
    /// let representative = Genome::unconnected(&config);
    /// let species = Species::new(SpeciesID(1, 0), representative.clone());
    ///
    /// assert_eq!(species.genetic_distance(&representative, &config), 0.0);
    /// ```
    pub fn genetic_distance(&self, other: &Genome, config: &GeneticConfig) -> f32 {
        Genome::genetic_distance(&self.representative, other, config)
    }

    /// Returns the population indices of the species' members.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns whether the species has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns an iterator over the species' members,
    /// taken from `generation`.
    pub fn genomes<'a>(&'a self, generation: &'a [Genome]) -> impl Iterator<Item = &'a Genome> {
        self.members.iter().map(move |i| &generation[*i])
    }

    /// Returns the number of generations since
    /// the species' best fitness last improved.
    pub fn staleness(&self) -> usize {
        self.staleness
    }

    /// Returns the best fitness any member has achieved.
    pub fn best_fitness(&self) -> Option<f32> {
        self.best_fitness
    }

    /// Returns the species' _member-count adjusted_ fitness
    /// for the current generation, i.e., the sum of each
    /// member's fitness divided by the member count.
    pub fn adjusted_fitness(&self) -> f64 {
        self.adjusted_fitness
    }

    /// Returns the best-performing member.
    pub fn champion<'a>(&self, generation: &'a [Genome]) -> Option<&'a Genome> {
        self.members
            .iter()
            .map(|i| &generation[*i])
            .max_by(|a, b| compare_fitness(a, b))
    }

    pub(super) fn add_member(&mut self, index: usize) {
        self.members.push(index);
    }

    pub(super) fn clear_members(&mut self) {
        self.members.clear();
    }

    /// Refreshes the cached adjusted fitness, and the staleness
    /// counter: reset if the best fitness improved, otherwise
    /// incremented.
    pub(super) fn update_fitness(&mut self, generation: &[Genome]) {
        let size = self.members.len().max(1) as f64;
        self.adjusted_fitness = self
            .genomes(generation)
            .map(|g| g.ranking_fitness() as f64 / size)
            .sum();

        let best = self.champion(generation).and_then(Genome::fitness);
        match (best, self.best_fitness) {
            (Some(new), Some(old)) if new <= old => self.staleness += 1,
            (Some(new), _) => {
                self.best_fitness = Some(new);
                self.staleness = 0;
            }
            (None, _) => self.staleness += 1,
        }
    }

    /// Picks the representative used by the next speciation.
    pub(super) fn choose_representative(
        &mut self,
        policy: RepresentativePolicy,
        generation: &[Genome],
        config: &GeneticConfig,
        rng: &mut impl Rng,
    ) {
        let chosen = match policy {
            RepresentativePolicy::Champion => self.champion(generation),
            RepresentativePolicy::Random => self.members.choose(rng).map(|i| &generation[*i]),
            RepresentativePolicy::Closest => self
                .members
                .iter()
                .map(|i| &generation[*i])
                .min_by(|a, b| {
                    self.genetic_distance(a, config)
                        .partial_cmp(&self.genetic_distance(b, config))
                        .unwrap_or(Ordering::Equal)
                }),
        };
        if let Some(genome) = chosen {
            self.representative = genome.clone();
        }
    }

    /// Sorts members by descending fitness. Ties keep
    /// population order.
    pub(super) fn rank_members(&mut self, generation: &[Genome]) {
        self.members
            .sort_by(|a, b| compare_fitness(&generation[*b], &generation[*a]));
    }
}

/// Orders genomes by fitness, unevaluated genomes first.
pub(super) fn compare_fitness(a: &Genome, b: &Genome) -> Ordering {
    a.ranking_fitness()
        .partial_cmp(&b.ranking_fitness())
        .unwrap_or(Ordering::Equal)
}
