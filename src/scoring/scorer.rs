//! Weighted scoring of rule flags

use crate::types::flags::{Flag, FlagSet};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Integer weight per flag. Flags absent from the table never contribute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeightTable {
    weights: BTreeMap<Flag, u32>,
}

impl WeightTable {
    pub fn new(weights: BTreeMap<Flag, u32>) -> Self {
        Self { weights }
    }

    /// Build from configuration keyed by flag name.
    ///
    /// Unknown names are logged and skipped rather than failing the run.
    pub fn from_names(named: &HashMap<String, u32>) -> Self {
        let mut weights = BTreeMap::new();
        for (name, &weight) in named {
            match name.parse::<Flag>() {
                Ok(flag) => {
                    weights.insert(flag, weight);
                }
                Err(e) => warn!(error = %e, weight = weight, "Ignoring weight for unknown flag"),
            }
        }
        Self { weights }
    }

    pub fn weight(&self, flag: Flag) -> Option<u32> {
        self.weights.get(&flag).copied()
    }

    /// Set weight for a specific flag.
    pub fn set_weight(&mut self, flag: Flag, weight: u32) {
        self.weights.insert(flag, weight);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Flag, u32)> + '_ {
        self.weights.iter().map(|(&f, &w)| (f, w))
    }

    /// Highest score a single transaction can reach
    pub fn max_score(&self) -> u32 {
        self.weights
            .values()
            .fold(0u32, |acc, &w| acc.saturating_add(w))
    }
}

/// Maps a transaction's flags to a single integer score.
pub struct RuleScorer {
    weights: WeightTable,
}

impl RuleScorer {
    pub fn new(weights: WeightTable) -> Self {
        Self { weights }
    }

    /// Sum of weights of the raised flags.
    ///
    /// Only flags that are both weighted and computed take part; a flag that
    /// was not computed adds nothing.
    pub fn score(&self, flags: &FlagSet) -> u32 {
        self.weights
            .iter()
            .filter(|&(flag, _)| flags.is_raised(flag))
            .fold(0u32, |acc, (_, weight)| acc.saturating_add(weight))
    }

    /// Per-flag contribution to a score, for display
    pub fn breakdown(&self, flags: &FlagSet) -> Vec<(Flag, u32)> {
        self.weights
            .iter()
            .filter(|&(flag, _)| flags.is_raised(flag))
            .collect()
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }
}

impl Default for RuleScorer {
    fn default() -> Self {
        Self::new(WeightTable::from_names(&crate::config::default_weights()))
    }
}
