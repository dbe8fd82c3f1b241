use std::error::Error;
use std::fmt;

/// An error type indicating an invalid configuration,
/// detected before any generation runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The population size is zero.
    EmptyPopulation,
    /// Genomes were configured with no inputs.
    NoInputs,
    /// Genomes were configured with no outputs.
    NoOutputs,
    /// A probability lies outside of [0, 1].
    InvalidProbability { name: &'static str, value: f32 },
    /// A quantity which must be strictly positive is not.
    NonPositive { name: &'static str, value: f32 },
    /// A quantity which must be non-negative and finite is not.
    Negative { name: &'static str, value: f32 },
    /// The survival fraction lies outside of (0, 1].
    InvalidSurvivalFraction(f32),
    /// The fitness threshold is NaN.
    InvalidFitnessThreshold(f32),
}

/// An error type indicating a run could not continue.
#[derive(Debug, Clone, PartialEq)]
pub enum EvolutionError {
    /// The fitness function returned NaN or an infinity.
    NonFiniteFitness { genome_index: usize, value: f32 },
    /// Evolution was attempted before evaluating the population.
    Unevaluated,
    /// The run was misconfigured.
    Config(ConfigError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPopulation => write!(f, "population size must be at least 1"),
            Self::NoInputs => write!(f, "genomes must have at least 1 input"),
            Self::NoOutputs => write!(f, "genomes must have at least 1 output"),
            Self::InvalidProbability { name, value } => {
                write!(f, "{} must be in [0, 1], got {}", name, value)
            }
            Self::NonPositive { name, value } => {
                write!(f, "{} must be positive, got {}", name, value)
            }
            Self::Negative { name, value } => {
                write!(f, "{} must be non-negative and finite, got {}", name, value)
            }
            Self::InvalidSurvivalFraction(value) => {
                write!(f, "survival fraction must be in (0, 1], got {}", value)
            }
            Self::InvalidFitnessThreshold(value) => {
                write!(f, "invalid fitness threshold {}", value)
            }
        }
    }
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteFitness { genome_index, value } => write!(
                f,
                "fitness function returned {} for genome {}",
                value, genome_index
            ),
            Self::Unevaluated => write!(f, "attempted evolution on unevaluated population"),
            Self::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl Error for ConfigError {}

impl Error for EvolutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for EvolutionError {
    fn from(e: ConfigError) -> EvolutionError {
        EvolutionError::Config(e)
    }
}

pub(crate) fn check_probability(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { name, value })
    }
}

pub(crate) fn check_non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

pub(crate) fn check_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_bounds() {
        assert!(check_probability("p", 0.0).is_ok());
        assert!(check_probability("p", 1.0).is_ok());
        assert!(check_probability("p", -0.1).is_err());
        assert!(check_probability("p", f32::NAN).is_err());
    }

    #[test]
    fn config_error_is_source() {
        let e = EvolutionError::from(ConfigError::NoOutputs);
        assert_eq!(e.source().map(|s| s.to_string()), Some(ConfigError::NoOutputs.to_string()));
    }
}
