//! Shared probe machinery for table-driven detectors.
//!
//! Most heuristics reduce to "look up one signal path, test one predicate,
//! report one tag". Representing them as [`Probe`] rows keeps each detector
//! an ordered data table evaluated top-to-bottom with first-match-wins
//! semantics, instead of repeated control flow per target family.

use std::collections::HashMap;
use std::sync::RwLock;

use botvet_core::{BotKind, Snapshot};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

/// One predicate over a single signal path.
///
/// Predicates never match when the path is absent, failed, or of an
/// unexpected type; that degradation is what keeps detectors total.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Predicate {
    /// Non-null, non-false, non-zero, non-empty.
    Truthy,
    /// Explicitly `false` (distinct from absent).
    IsFalse,
    /// Case-insensitive pattern test over a string value.
    Matches(&'static str),
    /// String value present but the pattern does not occur.
    LacksMatch(&'static str),
    /// Array length equals.
    CountIs(u64),
    /// Numeric value `<=`.
    AtMost(f64),
    /// Numeric value `<`.
    Below(f64),
}

impl Predicate {
    pub(crate) fn holds(&self, value: &Value) -> bool {
        match self {
            Predicate::Truthy => truthy(value),
            Predicate::IsFalse => value.as_bool() == Some(false),
            Predicate::Matches(pattern) => value
                .as_str()
                .map(|s| pattern_matches(pattern, s))
                .unwrap_or(false),
            Predicate::LacksMatch(pattern) => value
                .as_str()
                .map(|s| !pattern_matches(pattern, s))
                .unwrap_or(false),
            Predicate::CountIs(n) => value.as_array().map(|a| a.len() as u64) == Some(*n),
            Predicate::AtMost(limit) => value.as_f64().map(|v| v <= *limit).unwrap_or(false),
            Predicate::Below(limit) => value.as_f64().map(|v| v < *limit).unwrap_or(false),
        }
    }
}

/// `(signal path, predicate, result tag)` row of a detector table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Probe {
    pub signal: &'static str,
    pub predicate: Predicate,
    pub verdict: BotKind,
}

/// Evaluate probe rows top-to-bottom; the first hit determines the verdict.
pub(crate) fn run_probes(snapshot: &Snapshot, probes: &[Probe]) -> Option<BotKind> {
    probes
        .iter()
        .find(|probe| {
            snapshot
                .trusted_path(probe.signal)
                .map(|value| probe.predicate.holds(value))
                .unwrap_or(false)
        })
        .map(|probe| probe.verdict)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Case-insensitive regex test with a process-wide compile cache. Detector
/// tables are static, so every pattern compiles once per process.
pub(crate) fn pattern_matches(pattern: &str, text: &str) -> bool {
    static PATTERNS: Lazy<RwLock<HashMap<String, Regex>>> =
        Lazy::new(|| RwLock::new(HashMap::new()));

    if let Some(re) = PATTERNS
        .read()
        .expect("pattern cache lock poisoned")
        .get(pattern)
    {
        return re.is_match(text);
    }

    let Ok(re) = RegexBuilder::new(pattern).case_insensitive(true).build() else {
        return false;
    };
    let hit = re.is_match(text);
    PATTERNS
        .write()
        .expect("pattern cache lock poisoned")
        .insert(pattern.to_string(), re);
    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use botvet_core::signal::names;
    use serde_json::json;

    #[test]
    fn matches_is_case_insensitive() {
        assert!(Predicate::Matches("headless").holds(&json!("Mozilla HeadlessChrome")));
        assert!(!Predicate::Matches("headless").holds(&json!("Mozilla Chrome")));
        // Non-string values never match.
        assert!(!Predicate::Matches("1").holds(&json!(1)));
    }

    #[test]
    fn lacks_match_requires_a_string() {
        assert!(Predicate::LacksMatch("native code").holds(&json!("function bind() {}")));
        assert!(!Predicate::LacksMatch("native code").holds(&json!("[native code]")));
        assert!(!Predicate::LacksMatch("native code").holds(&Value::Null));
    }

    #[test]
    fn numeric_predicates_reject_non_numbers() {
        assert!(Predicate::AtMost(2.0).holds(&json!(2)));
        assert!(!Predicate::AtMost(2.0).holds(&json!(3)));
        assert!(!Predicate::AtMost(2.0).holds(&json!("2")));
        assert!(Predicate::Below(100.0).holds(&json!(42.5)));
        assert!(!Predicate::Below(100.0).holds(&json!(100)));
    }

    #[test]
    fn truthiness() {
        assert!(Predicate::Truthy.holds(&json!(true)));
        assert!(Predicate::Truthy.holds(&json!("x")));
        assert!(Predicate::Truthy.holds(&json!([1])));
        assert!(!Predicate::Truthy.holds(&json!(false)));
        assert!(!Predicate::Truthy.holds(&json!(0)));
        assert!(!Predicate::Truthy.holds(&json!("")));
        assert!(!Predicate::Truthy.holds(&Value::Null));
    }

    #[test]
    fn run_probes_first_hit_wins() {
        const TABLE: &[Probe] = &[
            Probe {
                signal: names::USER_AGENT,
                predicate: Predicate::Matches("phantomjs"),
                verdict: BotKind::Phantom,
            },
            Probe {
                signal: names::USER_AGENT,
                predicate: Predicate::Matches("headless"),
                verdict: BotKind::HeadlessBrowser,
            },
        ];

        let snap = Snapshot::builder()
            .success(names::USER_AGENT, "PhantomJS headless build")
            .build();
        assert_eq!(run_probes(&snap, TABLE), Some(BotKind::Phantom));

        let snap = Snapshot::builder().failure(names::USER_AGENT).build();
        assert_eq!(run_probes(&snap, TABLE), None);
    }

    #[test]
    fn run_probes_descends_paths() {
        const TABLE: &[Probe] = &[Probe {
            signal: "webGL.renderer",
            predicate: Predicate::Matches("swiftshader"),
            verdict: BotKind::HeadlessBrowser,
        }];

        let snap = Snapshot::builder()
            .success(names::WEB_GL, json!({"vendor": "Google", "renderer": "SwiftShader"}))
            .build();
        assert_eq!(run_probes(&snap, TABLE), Some(BotKind::HeadlessBrowser));
    }
}
