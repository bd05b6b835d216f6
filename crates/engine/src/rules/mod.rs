//! Rule engine: externally supplied declarative rules over the snapshot.
//!
//! Provider records are normalized once into a [`RuleSet`] and published
//! through a [`RuleSetHandle`]. Refresh is an atomic full replace: a session
//! pins one `Arc<RuleSet>` for its whole evaluation and can never observe a
//! mix of old and new rules. The rule set outlives sessions; the engine
//! works identically with an empty or never-published set.

pub mod expr;
pub mod schema;

pub(crate) mod eval;

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::info;

pub use schema::{NormalizeReport, RecordResult, RecordStatus};

use schema::Rule;

/// An immutable, versioned collection of normalized rules.
#[derive(Debug, Default)]
pub struct RuleSet {
    version: u64,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Shared handle to the current rule set.
///
/// `current()` hands out the published `Arc`; `publish` swaps the whole set
/// under a short write lock and bumps the version. There is no partial
/// mutation path.
#[derive(Debug)]
pub struct RuleSetHandle {
    current: RwLock<Arc<RuleSet>>,
}

impl RuleSetHandle {
    /// A handle holding an empty version-0 rule set.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(RuleSet::default())),
        }
    }

    pub fn current(&self) -> Arc<RuleSet> {
        Arc::clone(&self.current.read().expect("rule set lock poisoned"))
    }

    /// Atomically replace the active rules. Returns the new version.
    pub fn publish(&self, rules: Vec<Rule>) -> u64 {
        let mut guard = self.current.write().expect("rule set lock poisoned");
        let version = guard.version() + 1;
        info!(version, rules = rules.len(), "publishing rule set");
        *guard = Arc::new(RuleSet { version, rules });
        version
    }

    /// Normalize a raw provider payload and publish the result, returning
    /// the per-record ingestion statuses.
    pub fn publish_payload(&self, payload: &Value) -> Vec<RecordResult> {
        let report = schema::normalize_records(payload);
        self.publish(report.rules);
        report.records
    }
}

impl Default for RuleSetHandle {
    fn default() -> Self {
        Self::new()
    }
}
