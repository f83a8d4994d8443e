//! Payload-driven decision logic.
//!
//! Everything in this module is a total function over the answer payload:
//! visibility checks and goto rules never error, they degrade to `false` when
//! a referenced answer is absent or has an unexpected shape.

pub mod answer;
pub mod explain;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::storyboard::Block;
pub use answer::*;
pub use explain::*;

/// A boolean expression over the answer payload.
///
/// The wire representation is structural: `{"all": [...]}`, `{"any": [...]}`,
/// `{"not": {...}}`, or a bare comparison object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    All { all: Vec<Condition> },
    Any { any: Vec<Condition> },
    Not { not: Box<Condition> },
    Cmp(Comparison),
}

impl Condition {
    /// Evaluates this condition against the current payload.
    ///
    /// An empty `all` is satisfied, an empty `any` is not. A comparison whose
    /// block (or named interaction) has no answer yet is never satisfied.
    pub fn is_satisfied(&self, payload: &AnswerPayload) -> bool {
        match self {
            Condition::All { all } => all.iter().all(|inner| inner.is_satisfied(payload)),
            Condition::Any { any } => any.iter().any(|inner| inner.is_satisfied(payload)),
            Condition::Not { not } => !not.is_satisfied(payload),
            Condition::Cmp(comparison) => comparison.is_satisfied(payload),
        }
    }
}

/// A single comparison between a stored answer and a fixed operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Id of the block whose answer is inspected.
    pub block: String,
    /// Restricts the comparison to records of one interaction. `None` spans
    /// every record the block has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<String>,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub operand: serde_json::Value,
}

impl Comparison {
    pub fn is_satisfied(&self, payload: &AnswerPayload) -> bool {
        let Some(entry) = payload.get(&self.block) else {
            return false;
        };
        let records: Vec<&AnswerRecord> = entry
            .records()
            .filter(|record| match &self.interaction {
                Some(interaction) => record.action_id == *interaction,
                None => true,
            })
            .collect();
        if records.is_empty() {
            return false;
        }

        let any_matches =
            |check: fn(&serde_json::Value, &serde_json::Value) -> bool| -> bool {
                records
                    .iter()
                    .any(|record| check(&record.comparable(), &self.operand))
            };

        match self.operator {
            ConditionOperator::Answered => true,
            ConditionOperator::Eq => any_matches(values_equal),
            ConditionOperator::Neq => !any_matches(values_equal),
            ConditionOperator::Contains => any_matches(value_contains),
            ConditionOperator::NotContains => !any_matches(value_contains),
            ConditionOperator::Gt => self.any_ordering(&records, |ord| ord == Ordering::Greater),
            ConditionOperator::Gte => self.any_ordering(&records, |ord| ord != Ordering::Less),
            ConditionOperator::Lt => self.any_ordering(&records, |ord| ord == Ordering::Less),
            ConditionOperator::Lte => self.any_ordering(&records, |ord| ord != Ordering::Greater),
        }
    }

    fn any_ordering(&self, records: &[&AnswerRecord], accept: fn(Ordering) -> bool) -> bool {
        records.iter().any(|record| {
            match (as_number(&record.comparable()), as_number(&self.operand)) {
                (Some(stored), Some(operand)) => {
                    stored.partial_cmp(&operand).map(accept).unwrap_or(false)
                }
                _ => false,
            }
        })
    }
}

/// Comparison operators accepted in storyboard conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Eq,
    Neq,
    Contains,
    NotContains,
    Gt,
    Gte,
    Lt,
    Lte,
    Answered,
}

/// The outcome of the first goto rule on a block whose condition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct GotoDecision {
    pub target: String,
    /// Position of the winning rule in the block's declared rule list.
    pub rule_index: usize,
}

/// Runs a block's goto rules in declared order and returns the first match.
pub fn evaluate_goto(block: &Block, payload: &AnswerPayload) -> Option<GotoDecision> {
    block
        .logics
        .iter()
        .enumerate()
        .find(|(_, rule)| rule.condition.is_satisfied(payload))
        .map(|(rule_index, rule)| GotoDecision {
            target: rule.target.clone(),
            rule_index,
        })
}

/// Whether a block shows up in the visible queue under the current payload.
///
/// Only looks at the block's own gates. Gates inherited from enclosing groups
/// are applied by [`QueueBlock::is_visible`](crate::queue::QueueBlock::is_visible).
pub fn is_visible(block: &Block, payload: &AnswerPayload) -> bool {
    if block.is_disabled {
        return false;
    }
    block
        .visible_when
        .as_ref()
        .is_none_or(|condition| condition.is_satisfied(payload))
}

/// Loose equality used by `eq`/`neq`: numbers compare numerically even when
/// one side arrived as a string, everything else uses structural equality.
fn values_equal(stored: &serde_json::Value, operand: &serde_json::Value) -> bool {
    match (stored, operand) {
        (serde_json::Value::String(a), serde_json::Value::String(b)) => a == b,
        _ => match (as_number(stored), as_number(operand)) {
            (Some(a), Some(b)) => a == b,
            _ => stored == operand,
        },
    }
}

/// Containment: substring for text answers, membership for sequence answers,
/// equality for everything else.
fn value_contains(stored: &serde_json::Value, operand: &serde_json::Value) -> bool {
    match stored {
        serde_json::Value::String(text) => match operand {
            serde_json::Value::String(needle) => text.contains(needle.as_str()),
            other => text.contains(&other.to_string()),
        },
        serde_json::Value::Array(items) => {
            items.iter().any(|item| values_equal(item, operand))
        }
        other => values_equal(other, operand),
    }
}

fn as_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
