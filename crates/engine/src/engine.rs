//! The aggregator: one linear pipeline per session.
//!
//! SnapshotReady → DetectorsEvaluated → RulesEvaluated → ResultFinalized.
//! Sessions are independent; the engine carries no session-scoped mutable
//! state, so any number may run concurrently. The only shared state is the
//! rule set handle, read through one pinned `Arc` per session.

use botvet_core::{EngineError, Snapshot};
use indexmap::IndexMap;
use tracing::debug;

use crate::config::EngineConfig;
use crate::detectors::{self, Detector};
use crate::result::{DetectionResult, DetectorOutcome};
use crate::rules::{eval, RuleSetHandle};

/// The classification engine: fixed detector registry + refreshable rules.
#[derive(Debug)]
pub struct Engine {
    detectors: &'static [Detector],
    rules: RuleSetHandle,
    config: EngineConfig,
}

impl Engine {
    /// Build an engine, validating registry invariants. Configuration
    /// defects (empty registry, duplicate names) fail here, never inside a
    /// detection session.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let detectors = detectors::registry();
        detectors::validate_registry(detectors)?;
        Ok(Self {
            detectors,
            rules: RuleSetHandle::new(),
            config,
        })
    }

    /// The shared rule set handle; providers publish through this.
    pub fn rules(&self) -> &RuleSetHandle {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Classify one snapshot.
    ///
    /// `isBot` is true iff at least one detector or rule matched. `botKind`
    /// precedence: first matching detector in registry order, else the
    /// first matching rule's result in rule-set order, else `None`. The
    /// audit trail records every detector's and every rule's outcome.
    pub fn detect(&self, snapshot: &Snapshot) -> DetectionResult {
        // Pin one rule set version for the whole session.
        let ruleset = self.rules.current();

        let mut detector_outcomes = IndexMap::with_capacity(self.detectors.len());
        let mut detector_kind = None;
        for detector in self.detectors {
            let verdict = detector.run(snapshot);
            if let Some(kind) = verdict {
                debug!(detector = detector.name(), kind = %kind, "detector matched");
                detector_kind.get_or_insert(kind);
            }
            detector_outcomes.insert(
                detector.name().to_string(),
                DetectorOutcome {
                    bot: verdict.is_some(),
                },
            );
        }

        let mut matched_rules = Vec::with_capacity(ruleset.len());
        let mut rule_kind = None;
        for rule in ruleset.rules() {
            let outcome = eval::evaluate_rule(rule, snapshot, self.config.match_policy);
            if outcome.detected {
                debug!(rule = %outcome.rule_name, "rule matched");
                if rule_kind.is_none() {
                    rule_kind = outcome.details.result;
                }
            }
            matched_rules.push(outcome);
        }

        let is_bot = detector_kind.is_some() || matched_rules.iter().any(|r| r.detected);
        DetectionResult {
            is_bot,
            bot_kind: detector_kind.or(rule_kind),
            matched_rules,
            detector_outcomes,
        }
    }
}
