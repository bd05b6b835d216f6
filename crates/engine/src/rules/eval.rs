//! Per-rule evaluation against one snapshot.
//!
//! Every condition is evaluated in declared order with no short-circuit,
//! because the audit trail records all outcomes. A condition that fails to
//! evaluate is logged and counted false; it never aborts the rule or the
//! session.

use botvet_core::Snapshot;
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::MatchPolicy;
use crate::result::{RuleDetails, RuleOutcome};

use super::expr::Scope;
use super::schema::Rule;

pub(crate) fn evaluate_rule(
    rule: &Rule,
    snapshot: &Snapshot,
    policy: MatchPolicy,
) -> RuleOutcome {
    // Bind each declared parameter to the snapshot's raw value, ignoring
    // acquisition state; absent signals bind to null. The scope is local to
    // this rule's conditions.
    let mut parameters = Map::new();
    let mut scope = Scope::new();
    for parameter in &rule.parameters {
        let value = snapshot
            .get(parameter)
            .map(|signal| signal.value.clone())
            .unwrap_or(Value::Null);
        parameters.insert(parameter.clone(), value.clone());
        scope.bind(parameter.clone(), value);
    }

    let mut matched: Vec<usize> = Vec::new();
    for (index, condition) in rule.conditions.iter().enumerate() {
        let hit = match &condition.expr {
            // Failed to compile at normalization; warned there once.
            None => false,
            Some(expr) => match expr.eval(&scope) {
                Ok(hit) => hit,
                Err(e) => {
                    warn!(
                        rule = %rule.name,
                        condition = %condition.source,
                        error = %e,
                        "condition evaluation failed; treating as false"
                    );
                    false
                }
            },
        };
        if hit {
            matched.push(index);
        }
    }

    let selected = match policy {
        MatchPolicy::FirstMatch => matched.first(),
        MatchPolicy::LastMatch | MatchPolicy::AllMatches => matched.last(),
    }
    .map(|&index| &rule.conditions[index]);

    let matched_conditions = match policy {
        MatchPolicy::AllMatches => matched
            .iter()
            .map(|&index| rule.conditions[index].source.clone())
            .collect(),
        _ => Vec::new(),
    };

    RuleOutcome {
        rule_name: rule.name.clone(),
        detected: !matched.is_empty(),
        details: RuleDetails {
            parameters,
            matched_condition: selected.map(|c| c.source.clone()),
            result: selected.map(|c| c.result),
            matched_conditions,
        },
    }
}
