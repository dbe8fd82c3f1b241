use crate::genomics::Genome;

use serde::{Deserialize, Serialize};

/// A `Selector` chooses which members of a species
/// may become parents.
pub trait Selector {
    /// Returns the breeding pool, given the species'
    /// members sorted by descending fitness.
    fn select<'a>(&self, ranked: &'a [Genome]) -> &'a [Genome];
}

/// Truncation selection: only the top fraction of
/// each species may reproduce.
///
/// # Examples
/// ```
/// use ferroneat::{EliteSelection, Selector};
/// use ferroneat::genomics::{GeneticConfig, Genome};
///
/// let ranked = vec![Genome::unconnected(&GeneticConfig::zero()); 10];
///
/// let selection = EliteSelection { survival_fraction: 0.25 };
/// assert_eq!(selection.select(&ranked).len(), 3);
///
/// // At least one member always survives.
/// let selection = EliteSelection { survival_fraction: 0.01 };
/// assert_eq!(selection.select(&ranked).len(), 1);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EliteSelection {
    /// Fraction of members kept, rounded up.
    pub survival_fraction: f32,
}

impl Selector for EliteSelection {
    fn select<'a>(&self, ranked: &'a [Genome]) -> &'a [Genome] {
        let survivors = (ranked.len() as f32 * self.survival_fraction).ceil() as usize;
        &ranked[..survivors.clamp(1, ranked.len().max(1)).min(ranked.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::GeneticConfig;

    #[test]
    fn keeps_everyone_at_full_fraction() {
        let ranked = vec![Genome::unconnected(&GeneticConfig::zero()); 7];
        let selection = EliteSelection { survival_fraction: 1.0 };
        assert_eq!(selection.select(&ranked).len(), 7);
    }

    #[test]
    fn empty_species() {
        let selection = EliteSelection { survival_fraction: 0.5 };
        assert!(selection.select(&[]).is_empty());
    }
}
