//! Comparison and merge policy knobs

use serde::{Deserialize, Serialize};

/// How first/last names are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameComparison {
    /// Exact value equality after trimming
    #[default]
    Exact,
    /// Equality after trimming, ignoring case
    IgnoreCase,
}

/// What a `modified` decision with no selected field applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnselectedFallback {
    /// Overwrite every field whose external value differs
    #[default]
    ApplyAllDiffering,
    /// Leave the stored person untouched
    KeepStored,
}

/// Policy shared by the comparator and the sync applier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    #[serde(default)]
    pub name_comparison: NameComparison,
    #[serde(default)]
    pub unselected_fallback: UnselectedFallback,
}

impl ReconcilePolicy {
    /// Whether two name values count as the same under this policy
    #[must_use]
    pub fn names_equal(&self, stored: &str, external: &str) -> bool {
        let (stored, external) = (stored.trim(), external.trim());
        match self.name_comparison {
            NameComparison::Exact => stored == external,
            NameComparison::IgnoreCase => stored.to_lowercase() == external.to_lowercase(),
        }
    }
}
