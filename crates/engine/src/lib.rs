//! Browser automation classification engine.
//!
//! This crate provides:
//! - A fixed registry of pure heuristic detectors over a signal [`Snapshot`]
//! - A rule engine evaluating externally supplied declarative rules in a
//!   restricted expression language (no ambient scope, no code execution)
//! - An aggregator merging both into one auditable [`DetectionResult`]
//!
//! The engine is synchronous end-to-end: every asynchronous observation is
//! resolved during snapshot construction, outside this crate. Sessions are
//! independent; the only shared state is the atomically-replaced rule set.

pub mod config;
pub mod detectors;
pub mod engine;
pub mod result;
pub mod rules;

pub use botvet_core::{BotKind, EngineError, Signal, SignalState, Snapshot, SnapshotBuilder};
pub use config::{EngineConfig, MatchPolicy};
pub use engine::Engine;
pub use result::{DetectionResult, DetectorOutcome, RuleDetails, RuleOutcome};
pub use rules::{RuleSet, RuleSetHandle};
