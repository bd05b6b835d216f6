//! Fixed library of pure classification heuristics.
//!
//! Every detector is a named, total function from a [`Snapshot`] to an
//! optional [`BotKind`]. Detectors declare the signals they require; if any
//! required signal is absent or failed, the heuristic is not invoked and
//! the outcome is "no match". Nothing here throws, blocks, or awaits.
//!
//! Registry order is fixed and load-bearing: the aggregator resolves
//! `botKind` to the first matching detector in this order.

mod consistency;
mod drivers;
mod identity;
mod markers;
pub(crate) mod probes;

use botvet_core::{BotKind, EngineError, Snapshot};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// A named pure heuristic with declared signal requirements.
pub struct Detector {
    name: &'static str,
    requires: &'static [&'static str],
    check: fn(&Snapshot) -> Option<BotKind>,
}

impl Detector {
    pub(crate) fn new(
        name: &'static str,
        requires: &'static [&'static str],
        check: fn(&Snapshot) -> Option<BotKind>,
    ) -> Self {
        Self {
            name,
            requires,
            check,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signals that must be successfully acquired for the heuristic to run.
    pub fn requires(&self) -> &'static [&'static str] {
        self.requires
    }

    /// Run the heuristic. Missing or failed required signals short out to
    /// "no match" without invoking it.
    pub fn run(&self, snapshot: &Snapshot) -> Option<BotKind> {
        for signal in self.requires {
            if snapshot.trusted(signal).is_none() {
                return None;
            }
        }
        (self.check)(snapshot)
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .finish()
    }
}

/// The fixed detector registry, in evaluation (and precedence) order.
///
/// The order reproduces the upstream library's detector index, with the
/// driver stacks last.
pub fn registry() -> &'static [Detector] {
    static REGISTRY: Lazy<Vec<Detector>> = Lazy::new(|| {
        vec![
            identity::app_version(),
            consistency::document_attributes(),
            identity::error_trace(),
            consistency::eval_length(),
            identity::function_bind(),
            consistency::languages_inconsistency(),
            consistency::mime_types_consistency(),
            consistency::notification_permissions(),
            consistency::plugins_array(),
            consistency::process(),
            consistency::product_sub(),
            identity::user_agent(),
            markers::automation_marker(),
            consistency::software_renderer(),
            identity::window_external(),
            consistency::window_size(),
            markers::distinctive_markers(),
            drivers::puppeteer(),
            drivers::pyppeteer_stealth(),
            drivers::undetected_driver(),
            drivers::browserless(),
        ]
    });
    &REGISTRY
}

/// Startup invariant check: a registry must be non-empty with unique names.
/// Violations are configuration defects and abort engine construction.
pub fn validate_registry(detectors: &[Detector]) -> Result<(), EngineError> {
    if detectors.is_empty() {
        return Err(EngineError::InvariantViolation(
            "detector registry is empty".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for detector in detectors {
        if !seen.insert(detector.name) {
            return Err(EngineError::InvariantViolation(format!(
                "duplicate detector name '{}'",
                detector.name
            )));
        }
    }
    Ok(())
}
