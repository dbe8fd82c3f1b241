use crate::genomics::Genome;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy used to run the fitness function
/// over a generation.
///
/// Either way, all scores are collected before
/// the population is touched again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Evaluation {
    /// Evaluate genomes one after the other, in population order.
    #[default]
    Serial,
    /// Evaluate genomes concurrently on rayon's global thread pool.
    Parallel,
}

impl Evaluation {
    /// Returns the score of every genome, in the same order.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::Evaluation;
    /// use ferroneat::genomics::{GeneticConfig, Genome};
    ///
    /// let genomes = vec![Genome::unconnected(&GeneticConfig::zero()); 4];
    /// let scores = Evaluation::Parallel.evaluate(&genomes, &|g: &Genome| g.nodes().count() as f32);
    ///
    /// assert_eq!(scores, vec![2.0; 4]);
    /// ```
    pub fn evaluate<F>(self, genomes: &[Genome], fitness: &F) -> Vec<f32>
    where
        F: Fn(&Genome) -> f32 + Sync,
    {
        match self {
            Evaluation::Serial => genomes.iter().map(fitness).collect(),
            Evaluation::Parallel => genomes.par_iter().map(fitness).collect(),
        }
    }
}
