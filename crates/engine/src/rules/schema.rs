//! Provider record shapes and normalization into canonical rules.
//!
//! Records arrive as untrusted JSON in one of two shapes: the structured
//! form (`name` + `parameters` + `conditions`) or a simplified single-field
//! form (`type: "userAgent" | "navigatorProperty"`). Ingestion is two-pass:
//! a lenient envelope read classifies the shape, then the concrete form is
//! deserialized and compiled. Malformed records are skipped with a warning
//! and reported per record; they are never fatal.

use std::str::FromStr;

use botvet_core::BotKind;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::expr::{self, Expr};

// ── Canonical shape ─────────────────────────────────────────────────

/// A normalized rule ready for evaluation.
#[derive(Debug)]
pub struct Rule {
    pub name: String,
    /// Signal names bound into the condition scope, in declared order.
    pub parameters: Vec<String>,
    pub conditions: Vec<Condition>,
}

/// One compiled condition.
#[derive(Debug)]
pub struct Condition {
    /// Original expression text, kept for the audit trail.
    pub source: String,
    /// Compiled expression; `None` when the source failed to parse, in
    /// which case the condition is permanently false but still audited.
    pub expr: Option<Expr>,
    pub result: BotKind,
}

// ── Raw provider shapes ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawStructuredRule {
    name: String,
    parameters: Vec<RawParameter>,
    conditions: Vec<RawCondition>,
}

#[derive(Debug, Deserialize)]
struct RawParameter {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    condition: String,
    result: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawSimplifiedRule {
    #[serde(rename = "userAgent")]
    UserAgent {
        #[serde(default)]
        name: Option<String>,
        pattern: String,
        result: String,
    },
    #[serde(rename = "navigatorProperty")]
    NavigatorProperty {
        #[serde(default)]
        name: Option<String>,
        property: String,
        value: Value,
        result: String,
    },
}

// ── Per-record ingestion report ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Loaded { rule_name: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordResult {
    /// Index of the record in the provider payload.
    pub index: usize,
    pub status: RecordStatus,
}

/// Outcome of normalizing one provider payload.
#[derive(Debug, Default)]
pub struct NormalizeReport {
    pub rules: Vec<Rule>,
    pub records: Vec<RecordResult>,
}

impl NormalizeReport {
    pub fn skipped(&self) -> impl Iterator<Item = &RecordResult> {
        self.records
            .iter()
            .filter(|r| matches!(r.status, RecordStatus::Skipped { .. }))
    }
}

// ── Normalization ───────────────────────────────────────────────────

/// Normalize a provider payload (a JSON array of records, or an object
/// whose values are records) into canonical rules.
pub fn normalize_records(payload: &Value) -> NormalizeReport {
    let records: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        other => {
            warn!(
                payload_type = %json_type(other),
                "rule payload must be an array or object; ignoring"
            );
            return NormalizeReport::default();
        }
    };

    let mut report = NormalizeReport::default();
    for (index, record) in records.into_iter().enumerate() {
        match normalize_record(record, index) {
            Ok(rule) => {
                debug!(rule = %rule.name, conditions = rule.conditions.len(), "loaded rule");
                report.records.push(RecordResult {
                    index,
                    status: RecordStatus::Loaded {
                        rule_name: rule.name.clone(),
                    },
                });
                report.rules.push(rule);
            }
            Err(reason) => {
                warn!(index, reason = %reason, "skipping malformed rule record");
                report.records.push(RecordResult {
                    index,
                    status: RecordStatus::Skipped { reason },
                });
            }
        }
    }
    report
}

fn normalize_record(record: &Value, index: usize) -> Result<Rule, String> {
    let Some(fields) = record.as_object() else {
        return Err(format!("record is {}, not an object", json_type(record)));
    };

    // First pass: classify the shape by its discriminating field.
    if fields.contains_key("type") {
        let raw: RawSimplifiedRule = serde_json::from_value(record.clone())
            .map_err(|e| format!("malformed simplified rule: {}", e))?;
        normalize_simplified(raw, index)
    } else if fields.contains_key("conditions") || fields.contains_key("parameters") {
        let raw: RawStructuredRule = serde_json::from_value(record.clone())
            .map_err(|e| format!("malformed structured rule: {}", e))?;
        Ok(normalize_structured(raw))
    } else {
        Err("record is neither a structured nor a simplified rule".to_string())
    }
}

fn normalize_structured(raw: RawStructuredRule) -> Rule {
    let parameters: Vec<String> = raw.parameters.into_iter().map(|p| p.name).collect();

    let mut conditions = Vec::with_capacity(raw.conditions.len());
    for raw_condition in raw.conditions {
        let result = match BotKind::from_str(&raw_condition.result) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(
                    rule = %raw.name,
                    condition = %raw_condition.condition,
                    error = %e,
                    "dropping condition with unknown result tag"
                );
                continue;
            }
        };
        let expr = match expr::parse(&raw_condition.condition) {
            Ok(expr) => Some(expr),
            Err(e) => {
                warn!(
                    rule = %raw.name,
                    condition = %raw_condition.condition,
                    error = %e,
                    "condition failed to compile; it will never match"
                );
                None
            }
        };
        conditions.push(Condition {
            source: raw_condition.condition,
            expr,
            result,
        });
    }

    Rule {
        name: raw.name,
        parameters,
        conditions,
    }
}

/// Expand a simplified record into an equivalent one-condition rule in the
/// same restricted language, so a single evaluation path serves both
/// provider shapes.
fn normalize_simplified(raw: RawSimplifiedRule, index: usize) -> Result<Rule, String> {
    match raw {
        RawSimplifiedRule::UserAgent {
            name,
            pattern,
            result,
        } => {
            let result = BotKind::from_str(&result)?;
            let source = format!("matches(userAgent, \"{}\")", escape_literal(&pattern));
            let expr = expr::parse(&source).map_err(|e| format!("invalid pattern: {}", e))?;
            Ok(Rule {
                name: name.unwrap_or_else(|| format!("rule_{}", index)),
                parameters: vec!["userAgent".to_string()],
                conditions: vec![Condition {
                    source,
                    expr: Some(expr),
                    result,
                }],
            })
        }
        RawSimplifiedRule::NavigatorProperty {
            name,
            property,
            value,
            result,
        } => {
            let result = BotKind::from_str(&result)?;
            let literal = render_literal(&value)?;
            let source = format!("{} == {}", property, literal);
            let expr = expr::parse(&source)
                .map_err(|e| format!("property '{}' is not a valid identifier: {}", property, e))?;
            Ok(Rule {
                name: name.unwrap_or_else(|| format!("rule_{}", index)),
                parameters: vec![property],
                conditions: vec![Condition {
                    source,
                    expr: Some(expr),
                    result,
                }],
            })
        }
    }
}

fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn render_literal(value: &Value) -> Result<String, String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(format!("\"{}\"", escape_literal(s))),
        other => Err(format!(
            "navigatorProperty value must be a scalar, got {}",
            json_type(other)
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_rule_normalizes_with_compiled_conditions() {
        let payload = json!([{
            "name": "headless-combo",
            "parameters": [{"name": "userAgent"}, {"name": "webDriver"}],
            "conditions": [
                {"condition": "matches(userAgent, \"headless\")", "result": "HeadlessBrowser"},
                {"condition": "webDriver == true", "result": "Selenium"}
            ]
        }]);

        let report = normalize_records(&payload);
        assert_eq!(report.rules.len(), 1);
        let rule = &report.rules[0];
        assert_eq!(rule.name, "headless-combo");
        assert_eq!(rule.parameters, vec!["userAgent", "webDriver"]);
        assert_eq!(rule.conditions.len(), 2);
        assert!(rule.conditions.iter().all(|c| c.expr.is_some()));
        assert_eq!(
            report.records[0].status,
            RecordStatus::Loaded {
                rule_name: "headless-combo".to_string()
            }
        );
    }

    #[test]
    fn simplified_user_agent_rule_expands_to_matches_condition() {
        let payload = json!([
            {"type": "userAgent", "pattern": "bot", "result": "GenericAutomation"}
        ]);

        let report = normalize_records(&payload);
        assert_eq!(report.rules.len(), 1);
        let rule = &report.rules[0];
        assert_eq!(rule.name, "rule_0");
        assert_eq!(rule.parameters, vec!["userAgent"]);
        assert_eq!(rule.conditions[0].source, "matches(userAgent, \"bot\")");
        assert_eq!(rule.conditions[0].result, BotKind::GenericAutomation);
    }

    #[test]
    fn simplified_navigator_property_rule_expands_to_equality() {
        let payload = json!([
            {"type": "navigatorProperty", "property": "webDriver", "value": true,
             "result": "Selenium", "name": "wd-flag"}
        ]);

        let report = normalize_records(&payload);
        let rule = &report.rules[0];
        assert_eq!(rule.name, "wd-flag");
        assert_eq!(rule.parameters, vec!["webDriver"]);
        assert_eq!(rule.conditions[0].source, "webDriver == true");
    }

    #[test]
    fn non_array_conditions_skips_only_that_record() {
        let payload = json!([
            {"name": "broken", "parameters": [], "conditions": "not-an-array"},
            {"type": "userAgent", "pattern": "crawler", "result": "GenericAutomation"}
        ]);

        let report = normalize_records(&payload);
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.rules[0].conditions[0].source, "matches(userAgent, \"crawler\")");
        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.records[0].index, 0);
    }

    #[test]
    fn unknown_result_tag_drops_condition_not_rule() {
        let payload = json!([{
            "name": "partial",
            "parameters": [{"name": "userAgent"}],
            "conditions": [
                {"condition": "matches(userAgent, \"bot\")", "result": "NotARealKind"},
                {"condition": "matches(userAgent, \"spider\")", "result": "GenericAutomation"}
            ]
        }]);

        let report = normalize_records(&payload);
        assert_eq!(report.rules.len(), 1);
        assert_eq!(report.rules[0].conditions.len(), 1);
        assert_eq!(report.rules[0].conditions[0].result, BotKind::GenericAutomation);
    }

    #[test]
    fn unparseable_condition_is_kept_but_inert() {
        let payload = json!([{
            "name": "typo",
            "parameters": [{"name": "userAgent"}],
            "conditions": [
                {"condition": "userAgent ==", "result": "GenericAutomation"}
            ]
        }]);

        let report = normalize_records(&payload);
        assert_eq!(report.rules.len(), 1);
        let condition = &report.rules[0].conditions[0];
        assert!(condition.expr.is_none());
        assert_eq!(condition.source, "userAgent ==");
    }

    #[test]
    fn invalid_simplified_regex_skips_the_record() {
        let payload = json!([
            {"type": "userAgent", "pattern": "[", "result": "GenericAutomation"}
        ]);

        let report = normalize_records(&payload);
        assert!(report.rules.is_empty());
        assert_eq!(report.skipped().count(), 1);
    }

    #[test]
    fn object_payload_uses_values_as_records() {
        let payload = json!({
            "first": {"type": "userAgent", "pattern": "bot", "result": "GenericAutomation"}
        });

        let report = normalize_records(&payload);
        assert_eq!(report.rules.len(), 1);
    }

    #[test]
    fn scalar_payload_yields_nothing() {
        let report = normalize_records(&json!("rules!"));
        assert!(report.rules.is_empty());
        assert!(report.records.is_empty());
    }

    #[test]
    fn non_object_record_is_skipped() {
        let payload = json!([42]);
        let report = normalize_records(&payload);
        assert!(report.rules.is_empty());
        assert_eq!(report.skipped().count(), 1);
    }

    #[test]
    fn pattern_quotes_are_escaped_in_synthesized_source() {
        let payload = json!([
            {"type": "userAgent", "pattern": "bot\"?", "result": "GenericAutomation"}
        ]);

        let report = normalize_records(&payload);
        assert_eq!(report.rules.len(), 1);
        assert!(report.rules[0].conditions[0].expr.is_some());
    }
}
