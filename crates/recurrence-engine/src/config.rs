//! Expansion limits.
//!
//! Every field has a default, so a partial document (or none at all) deserializes
//! into a usable configuration.

use serde::{Deserialize, Serialize};

use crate::expander::{DEFAULT_LOOKAHEAD_MONTHS, DEFAULT_MAX_INSTANCES};

/// Default per-template cap for arbitrary-range queries.
pub const DEFAULT_RANGE_MAX_INSTANCES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-template occurrence cap for month views.
    pub monthly_max_instances: usize,
    /// Per-template occurrence cap for arbitrary-range views.
    pub range_max_instances: usize,
    /// How far ahead `next_occurrence` looks before giving up.
    pub lookahead_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monthly_max_instances: DEFAULT_MAX_INSTANCES,
            range_max_instances: DEFAULT_RANGE_MAX_INSTANCES,
            lookahead_months: DEFAULT_LOOKAHEAD_MONTHS,
        }
    }
}
