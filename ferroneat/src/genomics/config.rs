use crate::genomics::ActivationType;
use crate::populations::{check_non_negative, check_probability, ConfigError};

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for genome generation
/// and inter-genome operations.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]; [`validate`]
/// reports any that are not.
///
/// [`validate`]: GeneticConfig::validate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Number of inputs in a genome.
    pub input_count: NonZeroUsize,
    /// Number of outputs in a genome.
    pub output_count: NonZeroUsize,
    /// Number of distinct random input→output connections
    /// each initial genome starts with. Values larger than
    /// `input_count × output_count` are clamped.
    pub initial_connections: usize,
    /// Possible activation types for hidden nodes.
    /// If an empty vector is given, nodes will default
    /// to [`Sigmoid`].
    ///
    /// [`Sigmoid`]: crate::genomics::ActivationType
    pub hidden_activation_types: Vec<ActivationType>,
    /// Activation types of output nodes, by output index.
    /// If fewer than [`output_count`] are specified,
    /// the default is [`Sigmoid`].
    ///
    /// [`output_count`]: GeneticConfig::output_count
    /// [`Sigmoid`]: crate::genomics::ActivationType
    pub output_activation_types: Vec<ActivationType>,
    /// Whether enabled connections may form cycles.
    pub allow_recurrence: bool,
    /// New weights are drawn uniformly from `±weight_init_range`.
    pub weight_init_range: f32,
    /// Maximum magnitude of a perturbed weight.
    pub weight_bound: f32,
    /// Per-connection chance of a weight mutation.
    pub weight_mutation_chance: f32,
    /// Chance a weight mutation replaces the weight
    /// instead of perturbing it.
    pub weight_replace_chance: f32,
    /// Standard deviation of the Gaussian weight perturbation.
    pub weight_perturb_power: f32,
    /// Per-node chance of a bias mutation. Input nodes
    /// have no bias and are never mutated.
    pub bias_mutation_chance: f32,
    /// Chance a bias mutation replaces the bias instead of
    /// perturbing it. Biases share the weights' initialization
    /// range, perturbation power and bound.
    pub bias_replace_chance: f32,
    /// Chance of a connection addition mutation per child.
    pub add_connection_chance: f32,
    /// Chance of a node addition mutation per child.
    pub add_node_chance: f32,
    /// Per-connection chance of flipping the enabled flag.
    pub toggle_enable_chance: f32,
    /// Maximum number of candidate pairs tried by a connection
    /// addition mutation before it gives up.
    pub max_add_connection_attempts: usize,
    /// Chance a matching connection disabled in either parent
    /// is inherited disabled.
    pub disabled_inheritance_chance: f32,
    /// Weight of disjoint genes in genetic distance (`c1`).
    pub disjoint_gene_factor: f32,
    /// Weight of excess genes in genetic distance (`c2`).
    pub excess_gene_factor: f32,
    /// Weight of the mean matching-gene weight difference in genetic distance (`c3`).
    pub common_weight_factor: f32,
}

impl GeneticConfig {
    /// Returns a "zero-valued" configuration.
    /// All values are 0, empty, false, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    pub fn zero() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::MIN,
            output_count: NonZeroUsize::MIN,
            initial_connections: 0,
            hidden_activation_types: vec![],
            output_activation_types: vec![],
            allow_recurrence: false,
            weight_init_range: 0.0,
            weight_bound: 0.0,
            weight_mutation_chance: 0.0,
            weight_replace_chance: 0.0,
            weight_perturb_power: 0.0,
            bias_mutation_chance: 0.0,
            bias_replace_chance: 0.0,
            add_connection_chance: 0.0,
            add_node_chance: 0.0,
            toggle_enable_chance: 0.0,
            max_add_connection_attempts: 0,
            disabled_inheritance_chance: 0.0,
            disjoint_gene_factor: 0.0,
            excess_gene_factor: 0.0,
            common_weight_factor: 0.0,
        }
    }

    /// Returns a configuration with the usual NEAT settings
    /// for a genome with the given inputs and outputs.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::GeneticConfig;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig::with_shape(
    ///     NonZeroUsize::new(3).unwrap(),
    ///     NonZeroUsize::new(1).unwrap(),
    /// );
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn with_shape(input_count: NonZeroUsize, output_count: NonZeroUsize) -> GeneticConfig {
        GeneticConfig {
            input_count,
            output_count,
            ..GeneticConfig::default()
        }
    }

    /// Checks every probability lies in [0, 1] and every
    /// magnitude is non-negative and finite.
    ///
    /// # Errors
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("weight_mutation_chance", self.weight_mutation_chance)?;
        check_probability("weight_replace_chance", self.weight_replace_chance)?;
        check_probability("bias_mutation_chance", self.bias_mutation_chance)?;
        check_probability("bias_replace_chance", self.bias_replace_chance)?;
        check_probability("add_connection_chance", self.add_connection_chance)?;
        check_probability("add_node_chance", self.add_node_chance)?;
        check_probability("toggle_enable_chance", self.toggle_enable_chance)?;
        check_probability("disabled_inheritance_chance", self.disabled_inheritance_chance)?;
        check_non_negative("weight_init_range", self.weight_init_range)?;
        check_non_negative("weight_bound", self.weight_bound)?;
        check_non_negative("weight_perturb_power", self.weight_perturb_power)?;
        check_non_negative("disjoint_gene_factor", self.disjoint_gene_factor)?;
        check_non_negative("excess_gene_factor", self.excess_gene_factor)?;
        check_non_negative("common_weight_factor", self.common_weight_factor)?;
        Ok(())
    }
}

impl Default for GeneticConfig {
    fn default() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::MIN,
            output_count: NonZeroUsize::MIN,
            initial_connections: 0,
            hidden_activation_types: vec![ActivationType::Sigmoid],
            output_activation_types: vec![],
            allow_recurrence: false,
            weight_init_range: 1.0,
            weight_bound: 8.0,
            weight_mutation_chance: 0.8,
            weight_replace_chance: 0.1,
            weight_perturb_power: 0.5,
            bias_mutation_chance: 0.7,
            bias_replace_chance: 0.1,
            add_connection_chance: 0.2,
            add_node_chance: 0.1,
            toggle_enable_chance: 0.01,
            max_add_connection_attempts: 20,
            disabled_inheritance_chance: 0.75,
            disjoint_gene_factor: 1.0,
            excess_gene_factor: 1.0,
            common_weight_factor: 0.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_default_are_valid() {
        assert!(GeneticConfig::zero().validate().is_ok());
        assert!(GeneticConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_probability() {
        let config = GeneticConfig {
            add_node_chance: 1.5,
            ..GeneticConfig::zero()
        };
        match config.validate() {
            Err(ConfigError::InvalidProbability { name, .. }) => assert_eq!(name, "add_node_chance"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn rejects_negative_magnitude() {
        let config = GeneticConfig {
            weight_bound: -1.0,
            ..GeneticConfig::zero()
        };
        assert!(config.validate().is_err());
    }
}
