//! Per-generation reports, and a logger to
//! keep them over the course of a run.
use super::SpeciesID;

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::fmt;

/// A summary of one species in one generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesReport {
    pub id: SpeciesID,
    pub member_count: usize,
    pub mean_fitness: f32,
    pub best_fitness: f32,
    /// `(node count, enabled connection count)` of the species' champion.
    pub best_shape: (usize, usize),
    pub staleness: usize,
    /// Offspring allotted for the next generation.
    pub offspring: usize,
}

/// A summary of one evaluated generation,
/// produced by [`Population::evolve`].
///
/// [`Population::evolve`]: crate::Population::evolve
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: usize,
    /// Best fitness in this generation.
    pub best_fitness: f32,
    /// Best fitness of any generation so far.
    pub best_fitness_ever: f32,
    pub fitness: Stats,
    pub species: Vec<SpeciesReport>,
    /// Species removed for stagnating this generation.
    pub removed_species: Vec<SpeciesID>,
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "generation {}: best {:.4} (ever {:.4}), mean {:.4}, {} species",
            self.generation,
            self.best_fitness,
            self.best_fitness_ever,
            self.fitness.mean,
            self.species.len()
        )?;
        writeln!(
            f,
            "{:>10} {:>6} {:>10} {:>10} {:>10} {:>6} {:>6}",
            "species", "#mem", "avg fit", "best fit", "best shape", "stale", "#off"
        )?;
        for s in &self.species {
            writeln!(
                f,
                "{:>10} {:>6} {:>10.4} {:>10.4} {:>10} {:>6} {:>6}",
                format!("{}:{}", s.id.0, s.id.1),
                s.member_count,
                s.mean_fitness,
                s.best_fitness,
                format!("{}/{}", s.best_shape.0, s.best_shape.1),
                s.staleness,
                s.offspring,
            )?;
        }
        Ok(())
    }
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub maximum: f32,
    pub minimum: f32,
    pub mean: f32,
    pub median: f32,
}

impl Stats {
    /// Returns statistics about numbers in a sequence,
    /// or `None` if it is empty.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::logging::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied()).unwrap();
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    /// ```
    pub fn from(data: impl Iterator<Item = f32>) -> Option<Stats> {
        let mut data: Vec<f32> = data.collect();
        if data.is_empty() {
            return None;
        }
        data.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Some(Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: data.iter().sum::<f32>() / data.len() as f32,
            median,
        })
    }
}

/// A log of the evolution of a population over time.
///
/// Every logged report is also emitted through
/// the [`log`] facade at `info` level.
///
/// # Examples
/// ```no_run
/// use ferroneat::logging::EvolutionLogger;
/// # use ferroneat::genomics::{GeneticConfig, Genome};
/// # use ferroneat::{Population, PopulationConfig};
/// # let mut population = Population::new(PopulationConfig::default(), GeneticConfig::default()).unwrap();
/// # let fitness = |g: &Genome| 0.0;
///
/// let mut logger = EvolutionLogger::new();
/// population.start(&fitness, &mut |report| logger.log(report)).unwrap();
///
/// for report in logger.iter() {
///     println!("{}", report);
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct EvolutionLogger {
    reports: Vec<GenerationReport>,
}

impl EvolutionLogger {
    /// Returns an empty logger.
    pub fn new() -> EvolutionLogger {
        EvolutionLogger::default()
    }

    /// Stores a copy of `report`.
    pub fn log(&mut self, report: &GenerationReport) {
        log::info!("{}", report);
        self.reports.push(report.clone());
    }

    /// Iterate over all logged reports.
    pub fn iter(&self) -> impl Iterator<Item = &GenerationReport> {
        self.reports.iter()
    }

    /// Returns the most recent report.
    pub fn last(&self) -> Option<&GenerationReport> {
        self.reports.last()
    }

    /// Returns the best fitness of every logged generation, in order.
    pub fn best_fitness_history(&self) -> Vec<f32> {
        self.reports.iter().map(|r| r.best_fitness).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_median() {
        let stats = Stats::from([4.0, 1.0, 3.0, 2.0].iter().copied()).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 2.5);
    }

    #[test]
    fn empty_stats() {
        assert!(Stats::from(std::iter::empty()).is_none());
    }

    #[test]
    fn report_table() {
        let report = GenerationReport {
            generation: 3,
            best_fitness: 2.0,
            best_fitness_ever: 2.5,
            fitness: Stats::from([1.0, 2.0].iter().copied()).unwrap(),
            species: vec![SpeciesReport {
                id: SpeciesID(1, 0),
                member_count: 2,
                mean_fitness: 1.5,
                best_fitness: 2.0,
                best_shape: (4, 3),
                staleness: 0,
                offspring: 2,
            }],
            removed_species: vec![],
        };
        let table = report.to_string();
        assert!(table.starts_with("generation 3:"));
        assert!(table.contains("1:0"));
        assert!(table.contains("4/3"));

        let mut logger = EvolutionLogger::new();
        logger.log(&report);
        assert_eq!(logger.last(), Some(&report));
        assert_eq!(logger.best_fitness_history(), vec![2.0]);
    }
}
