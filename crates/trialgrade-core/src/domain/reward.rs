//! Reward axes and breakdown lookup.
//!
//! Upstream breakdown keys are inconsistent (`"DB"`, `"RewardType.DB"`,
//! `"reward_type.db "`). Every lookup goes through [`RewardAxis::resolve`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of reward sub-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardAxis {
    EnvAssertion,
    Action,
    Db,
    Communicate,
    NlAssertion,
}

impl RewardAxis {
    pub const ALL: [RewardAxis; 5] = [
        RewardAxis::EnvAssertion,
        RewardAxis::Action,
        RewardAxis::Db,
        RewardAxis::Communicate,
        RewardAxis::NlAssertion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RewardAxis::EnvAssertion => "ENV_ASSERTION",
            RewardAxis::Action => "ACTION",
            RewardAxis::Db => "DB",
            RewardAxis::Communicate => "COMMUNICATE",
            RewardAxis::NlAssertion => "NL_ASSERTION",
        }
    }

    /// Resolve a raw breakdown key: strip any dotted namespace, trim, and
    /// match case-insensitively.
    pub fn resolve(key: &str) -> Option<RewardAxis> {
        let bare = key.rsplit('.').next().unwrap_or(key).trim();
        Self::ALL
            .into_iter()
            .find(|axis| axis.as_str().eq_ignore_ascii_case(bare))
    }
}

impl fmt::Display for RewardAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look up an axis in a raw breakdown. The first key resolving to `axis` wins;
/// a matching key with an absent value yields `None`.
pub fn axis_value(breakdown: &BTreeMap<String, Option<f64>>, axis: RewardAxis) -> Option<f64> {
    breakdown
        .iter()
        .find(|(k, _)| RewardAxis::resolve(k) == Some(axis))
        .and_then(|(_, v)| *v)
}

/// Resolve every axis of a raw breakdown into a fixed-shape map.
pub fn resolve_breakdown(
    breakdown: &BTreeMap<String, Option<f64>>,
) -> BTreeMap<RewardAxis, Option<f64>> {
    RewardAxis::ALL
        .into_iter()
        .map(|axis| (axis, axis_value(breakdown, axis)))
        .collect()
}
