use itertools::Itertools;

use crate::logic::{AnswerPayload, Comparison, Condition, ConditionOperator};

/// Formats conditions into human-readable strings, with the answers that were
/// actually in play at evaluation time.
pub struct ConditionFormatter;

impl ConditionFormatter {
    /// Format a condition into a human-readable explanation such as
    /// `$color == "red" (was "blue") and $age >= 18 (was 21)`.
    pub fn format_condition(condition: &Condition, payload: &AnswerPayload) -> String {
        // Start the recursive formatting with the lowest possible parent precedence.
        Self::format_recursive(condition, payload, 0)
    }

    /// Recursively formats the condition, adding parentheses only when necessary.
    fn format_recursive(condition: &Condition, payload: &AnswerPayload, parent_precedence: u8) -> String {
        let current_precedence = Self::precedence(condition);
        let needs_parens = current_precedence < parent_precedence;

        let mut result = String::new();
        if needs_parens {
            result.push('(');
        }

        match condition {
            Condition::All { all } => {
                let joined = all
                    .iter()
                    .map(|inner| Self::format_recursive(inner, payload, current_precedence))
                    .join(" and ");
                result.push_str(&joined);
            }
            Condition::Any { any } => {
                let joined = any
                    .iter()
                    .map(|inner| Self::format_recursive(inner, payload, current_precedence))
                    .join(" or ");
                result.push_str(&joined);
            }
            Condition::Not { not } => {
                let child = Self::format_recursive(not, payload, current_precedence);
                result.push_str(&format!("not {child}"));
            }
            Condition::Cmp(comparison) => {
                result.push_str(&Self::format_comparison(comparison, payload));
            }
        }

        if needs_parens {
            result.push(')');
        }
        result
    }

    fn format_comparison(comparison: &Comparison, payload: &AnswerPayload) -> String {
        let mut source = format!("${}", comparison.block);
        if let Some(interaction) = &comparison.interaction {
            source.push('.');
            source.push_str(interaction);
        }

        let actual = Self::format_actual(comparison, payload);
        match comparison.operator {
            ConditionOperator::Answered => format!("{source} answered ({actual})"),
            operator => format!(
                "{source} {} {} ({actual})",
                Self::operator_symbol(operator),
                comparison.operand
            ),
        }
    }

    /// Renders the answer the comparison saw, collapsing a one-record entry to
    /// its bare value.
    fn format_actual(comparison: &Comparison, payload: &AnswerPayload) -> String {
        let Some(entry) = payload.get(&comparison.block) else {
            return "was unanswered".to_string();
        };
        let values: Vec<String> = entry
            .records()
            .filter(|record| match &comparison.interaction {
                Some(interaction) => record.action_id == *interaction,
                None => true,
            })
            .map(|record| record.comparable().to_string())
            .collect();
        match values.as_slice() {
            [] => "was unanswered".to_string(),
            [value] => format!("was {value}"),
            many => format!("was [{}]", many.iter().join(", ")),
        }
    }

    fn operator_symbol(operator: ConditionOperator) -> &'static str {
        match operator {
            ConditionOperator::Eq => "==",
            ConditionOperator::Neq => "!=",
            ConditionOperator::Contains => "contains",
            ConditionOperator::NotContains => "not contains",
            ConditionOperator::Gt => ">",
            ConditionOperator::Gte => ">=",
            ConditionOperator::Lt => "<",
            ConditionOperator::Lte => "<=",
            ConditionOperator::Answered => "answered",
        }
    }

    /// Precedence for parenthesization: `or` binds loosest, then `and`, then
    /// `not`, then bare comparisons.
    fn precedence(condition: &Condition) -> u8 {
        match condition {
            Condition::Any { .. } => 1,
            Condition::All { .. } => 2,
            Condition::Not { .. } => 3,
            Condition::Cmp(_) => 4,
        }
    }
}
