//! Detection session output: the verdict plus a full per-detector and
//! per-rule audit trail.
//!
//! Every detector's and every rule's outcome is recorded, not only the
//! winning one, so reporting collaborators can debug and replay sessions
//! offline. The wire shape (camelCase keys, `{bot: bool}` outcome objects)
//! is a published contract.

use botvet_core::BotKind;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Immutable output of one detection session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// True iff at least one detector or at least one rule matched.
    pub is_bot: bool,
    /// First matching detector in registry order, else the first matching
    /// rule's result in rule-set order, else null.
    pub bot_kind: Option<BotKind>,
    /// One entry per rule in rule-set order, matched or not.
    pub matched_rules: Vec<RuleOutcome>,
    /// One entry per detector, preserving registry order.
    pub detector_outcomes: IndexMap<String, DetectorOutcome>,
}

/// Audit entry for a single detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectorOutcome {
    pub bot: bool,
}

/// Audit entry for a single rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    pub rule_name: String,
    pub detected: bool,
    pub details: RuleDetails,
}

/// Evaluation details retained for offline analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDetails {
    /// The parameter scope the rule's conditions were evaluated against.
    pub parameters: Map<String, Value>,
    /// Source text of the condition selected by the match policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_condition: Option<String>,
    /// Result tag of the selected condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BotKind>,
    /// Source text of every true condition. Populated only under
    /// [`MatchPolicy::AllMatches`](crate::config::MatchPolicy).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_conditions: Vec<String>,
}
