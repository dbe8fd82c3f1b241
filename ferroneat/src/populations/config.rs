use super::errors::{check_positive, ConfigError};
use super::Evaluation;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// How each species chooses the representative that
/// genomes are compared against during the next speciation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepresentativePolicy {
    /// The species' best-performing member.
    #[default]
    Champion,
    /// A uniformly random member.
    Random,
    /// The member closest to the previous representative.
    Closest,
}

/// Configuration data for population generation
/// and evolution.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]; [`validate`]
/// reports any that are not.
///
/// [`validate`]: PopulationConfig::validate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Size of the population.
    pub size: NonZeroUsize,
    /// Genetic distance threshold, beyond which
    /// genomes are considered as belonging to
    /// different species.
    pub distance_threshold: f32,
    /// Minimum offspring quota for a species to have its
    /// champion copied unmutated to the next generation.
    /// If 0, no elites are kept.
    pub elitism: usize,
    /// Top fraction of each species eligible for mating.
    pub survival_fraction: f32,
    /// Number of generations without improvement after
    /// which a species is removed. If 0, species are never
    /// removed for stagnating.
    pub stagnation_limit: usize,
    /// Number of generations after which a run stops.
    pub max_generations: usize,
    /// Fitness at which a run stops, if any.
    pub fitness_threshold: Option<f32>,
    /// How species representatives are chosen.
    pub representative_policy: RepresentativePolicy,
    /// How fitness is evaluated.
    pub evaluation: Evaluation,
    /// Seed for the population's random number generator.
    /// If `None`, the generator is seeded from system entropy.
    pub seed: Option<u64>,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, `None`, or the default variant,
    /// and in the case of `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::PopulationConfig;
    ///
    /// let cfg1 = PopulationConfig::zero();
    ///
    /// let cfg2 = PopulationConfig {
    ///     // Specify some values here...
    ///     stagnation_limit: 15,
    ///     // Default the rest...
    ///     ..PopulationConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::MIN,
            distance_threshold: 0.0,
            elitism: 0,
            survival_fraction: 0.0,
            stagnation_limit: 0,
            max_generations: 0,
            fitness_threshold: None,
            representative_policy: RepresentativePolicy::Champion,
            evaluation: Evaluation::Serial,
            seed: None,
        }
    }

    /// Checks the configuration for values no run could use.
    ///
    /// # Errors
    /// Returns an error if the distance threshold is not
    /// positive, the survival fraction is outside of (0, 1],
    /// or the fitness threshold is NaN.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::{ConfigError, PopulationConfig};
    ///
    /// assert_eq!(
    ///     PopulationConfig::zero().validate(),
    ///     Err(ConfigError::NonPositive { name: "distance_threshold", value: 0.0 }),
    /// );
    /// assert!(PopulationConfig::default().validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("distance_threshold", self.distance_threshold)?;
        if !(self.survival_fraction > 0.0 && self.survival_fraction <= 1.0) {
            return Err(ConfigError::InvalidSurvivalFraction(self.survival_fraction));
        }
        match self.fitness_threshold {
            Some(threshold) if threshold.is_nan() => {
                Err(ConfigError::InvalidFitnessThreshold(threshold))
            }
            _ => Ok(()),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(150).unwrap_or(NonZeroUsize::MIN),
            distance_threshold: 3.0,
            elitism: 5,
            survival_fraction: 0.2,
            stagnation_limit: 15,
            max_generations: 100,
            fitness_threshold: None,
            representative_policy: RepresentativePolicy::Champion,
            evaluation: Evaluation::Serial,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_survival_fraction() {
        for fraction in [0.0, -1.0, 1.5, f32::NAN] {
            let config = PopulationConfig {
                survival_fraction: fraction,
                ..PopulationConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidSurvivalFraction(_))
            ));
        }
    }

    #[test]
    fn rejects_nan_threshold() {
        let config = PopulationConfig {
            fitness_threshold: Some(f32::NAN),
            ..PopulationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
