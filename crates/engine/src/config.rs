//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tie-break policy when several conditions of the same rule evaluate true.
///
/// `LastMatch` is the default: the last true condition in declared order
/// determines the rule's reported result. This reproduces the upstream
/// provider contract, where conditions were never short-circuited and each
/// later match overwrote the recorded one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// The first true condition in declared order wins.
    FirstMatch,
    /// The last true condition in declared order wins.
    #[default]
    LastMatch,
    /// Headline result as `LastMatch`, but every true condition is listed
    /// in the rule outcome details.
    AllMatches,
}

/// Typed engine configuration, validated once at engine construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub match_policy: MatchPolicy,
}
