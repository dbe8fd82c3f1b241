use crate::genomics::GeneticConfig;
use crate::Innovation;

use std::fmt;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Connection genes are the principal components of genomes.
/// They are created between two nodes, and become
/// network connections in the genome's phenotype.
///
/// A connection is never removed from a genome; disabling
/// it is the only way of taking it out of the phenotype.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ConnectionGene {
    marker: Innovation,
    source: Innovation,
    target: Innovation,
    weight: f32,
    enabled: bool,
}

impl ConnectionGene {
    /// Returns a new _enabled_ connection with the specified parameters.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::ConnectionGene;
    ///
    /// let connection = ConnectionGene::new(42, 3, 9, 2.0);
    /// assert!(connection.enabled());
    /// ```
    pub fn new(marker: Innovation, source: Innovation, target: Innovation, weight: f32) -> ConnectionGene {
        ConnectionGene {
            marker,
            source,
            target,
            weight,
            enabled: true,
        }
    }

    /// Returns a random weight. Uses a uniform distribution
    /// over the range ±[`weight_init_range`].
    ///
    /// [`weight_init_range`]: crate::genomics::GeneticConfig::weight_init_range
    pub(crate) fn random_weight(rng: &mut impl Rng, config: &GeneticConfig) -> f32 {
        if config.weight_init_range > 0.0 {
            rng.gen_range(-config.weight_init_range..=config.weight_init_range)
        } else {
            0.0
        }
    }

    /// Replaces the connection's weight with a fresh random value
    /// in ±[`weight_init_range`].
    ///
    /// [`weight_init_range`]: crate::genomics::GeneticConfig::weight_init_range
    pub fn randomize_weight(&mut self, rng: &mut impl Rng, config: &GeneticConfig) {
        self.weight = Self::random_weight(rng, config);
    }

    /// Perturbs the connection's weight by a Gaussian step with standard
    /// deviation [`weight_perturb_power`]. The result is clamped to
    /// ±[`weight_bound`].
    ///
    /// [`weight_perturb_power`]: crate::genomics::GeneticConfig::weight_perturb_power
    /// [`weight_bound`]: crate::genomics::GeneticConfig::weight_bound
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::{ConnectionGene, GeneticConfig};
    ///
    /// let config = GeneticConfig {
    ///     weight_perturb_power: 0.5,
    ///     weight_bound: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut connection = ConnectionGene::new(0, 0, 1, 0.9);
    /// connection.perturb_weight(&mut rand::thread_rng(), &config);
    ///
    /// assert!(connection.weight().abs() <= 1.0);
    /// ```
    pub fn perturb_weight(&mut self, rng: &mut impl Rng, config: &GeneticConfig) {
        self.weight = perturbed(self.weight, rng, config);
    }

    /// Returns the connection's historical marker.
    pub fn marker(&self) -> Innovation {
        self.marker
    }

    /// Returns the connection's source node id.
    pub fn source(&self) -> Innovation {
        self.source
    }

    /// Returns the connection's target node id.
    pub fn target(&self) -> Innovation {
        self.target
    }

    /// Returns the connection's source and target node ids.
    pub fn endpoints(&self) -> (Innovation, Innovation) {
        (self.source, self.target)
    }

    /// Returns the connection's weight.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Sets the connection's weight.
    pub fn set_weight(&mut self, w: f32) {
        self.weight = w;
    }

    /// Returns whether the connection is expressed in the phenotype.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Sets the connection's enabled flag.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl fmt::Display for ConnectionGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:?}[{:?}->{:?}, {:.3}]{}",
            if self.enabled { "" } else { "(" },
            self.marker,
            self.source,
            self.target,
            self.weight,
            if self.enabled { "" } else { ")" },
        )
    }
}

/// Adds a Gaussian step with standard deviation [`weight_perturb_power`]
/// to `value`, clamping the result to ±[`weight_bound`].
///
/// [`weight_perturb_power`]: GeneticConfig::weight_perturb_power
/// [`weight_bound`]: GeneticConfig::weight_bound
pub(super) fn perturbed(mut value: f32, rng: &mut impl Rng, config: &GeneticConfig) -> f32 {
    if config.weight_perturb_power > 0.0 {
        // A positive finite standard deviation is always accepted.
        if let Ok(normal) = Normal::new(0.0, config.weight_perturb_power) {
            value += normal.sample(rng);
        }
    }
    value.clamp(-config.weight_bound, config.weight_bound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_weight_within_range() {
        let config = GeneticConfig {
            weight_init_range: 2.0,
            ..GeneticConfig::zero()
        };
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            assert!(ConnectionGene::random_weight(&mut rng, &config).abs() <= 2.0);
        }
    }

    #[test]
    fn perturb_weight_clamps() {
        let config = GeneticConfig {
            weight_perturb_power: 100.0,
            weight_bound: 3.0,
            ..GeneticConfig::zero()
        };
        let mut rng = rand::thread_rng();
        let mut connection = ConnectionGene::new(0, 0, 1, 0.0);
        for _ in 0..100 {
            connection.perturb_weight(&mut rng, &config);
            assert!(connection.weight().abs() <= 3.0);
        }
    }

    #[test]
    fn display_marks_disabled() {
        let mut connection = ConnectionGene::new(4, 0, 1, 1.0);
        connection.set_enabled(false);
        assert_eq!(connection.to_string(), "(4[0->1, 1.000])");
    }
}
