//! Unit tests for condition evaluation, goto rules, and the formatter.
mod common;
use common::*;
use kaiwa::prelude::*;
use serde_json::json;

fn comparison(block: &str, operator: ConditionOperator, operand: serde_json::Value) -> Condition {
    Condition::Cmp(Comparison {
        block: block.to_string(),
        interaction: None,
        operator,
        operand,
    })
}

#[test]
fn test_eq_matches_recorded_value() {
    let payload = answered("color", "color-input", "red");
    assert!(comparison("color", ConditionOperator::Eq, json!("red")).is_satisfied(&payload));
    assert!(!comparison("color", ConditionOperator::Eq, json!("blue")).is_satisfied(&payload));
}

#[test]
fn test_unanswered_block_fails_every_operator() {
    let payload = AnswerPayload::new();
    let operators = [
        ConditionOperator::Eq,
        ConditionOperator::Neq,
        ConditionOperator::Contains,
        ConditionOperator::NotContains,
        ConditionOperator::Gt,
        ConditionOperator::Gte,
        ConditionOperator::Lt,
        ConditionOperator::Lte,
        ConditionOperator::Answered,
    ];
    for operator in operators {
        assert!(
            !comparison("missing", operator, json!("anything")).is_satisfied(&payload),
            "{operator:?} must not be satisfied without an answer"
        );
    }
}

#[test]
fn test_neq_on_answered_value() {
    let payload = answered("color", "color-input", "red");
    assert!(comparison("color", ConditionOperator::Neq, json!("blue")).is_satisfied(&payload));
    assert!(!comparison("color", ConditionOperator::Neq, json!("red")).is_satisfied(&payload));
}

#[test]
fn test_answered_operator() {
    let payload = answered("color", "color-input", "red");
    assert!(comparison("color", ConditionOperator::Answered, json!(null)).is_satisfied(&payload));
}

#[test]
fn test_numeric_string_coercion() {
    let payload = answered("age", "age-input", "42");
    assert!(comparison("age", ConditionOperator::Eq, json!(42)).is_satisfied(&payload));
    assert!(comparison("age", ConditionOperator::Eq, json!(42.0)).is_satisfied(&payload));
    assert!(comparison("age", ConditionOperator::Gt, json!(40)).is_satisfied(&payload));
    assert!(!comparison("age", ConditionOperator::Lt, json!(40)).is_satisfied(&payload));
}

#[test]
fn test_two_strings_compare_exactly() {
    // No numeric coercion when both sides are strings.
    let payload = answered("age", "age-input", "42.0");
    assert!(!comparison("age", ConditionOperator::Eq, json!("42")).is_satisfied(&payload));
    assert!(comparison("age", ConditionOperator::Eq, json!("42.0")).is_satisfied(&payload));
}

#[test]
fn test_contains_substring_and_membership() {
    let payload = answered("notes", "notes-input", "hello world");
    assert!(comparison("notes", ConditionOperator::Contains, json!("world")).is_satisfied(&payload));
    assert!(!comparison("notes", ConditionOperator::Contains, json!("moon")).is_satisfied(&payload));

    let mut list = AnswerPayload::new();
    list.insert(
        "tags".to_string(),
        AnswerEntry::Single(AnswerRecord::value("tags-input", json!(["a", "b"]))),
    );
    assert!(comparison("tags", ConditionOperator::Contains, json!("b")).is_satisfied(&list));
    assert!(!comparison("tags", ConditionOperator::Contains, json!("c")).is_satisfied(&list));
}

#[test]
fn test_not_contains_is_negated_containment() {
    let payload = answered("notes", "notes-input", "hello world");
    assert!(
        comparison("notes", ConditionOperator::NotContains, json!("moon")).is_satisfied(&payload)
    );
    assert!(
        !comparison("notes", ConditionOperator::NotContains, json!("world")).is_satisfied(&payload)
    );
}

#[test]
fn test_ordering_on_non_numeric_values_fails() {
    let payload = answered("color", "color-input", "red");
    assert!(!comparison("color", ConditionOperator::Gt, json!(1)).is_satisfied(&payload));
    assert!(!comparison("color", ConditionOperator::Lte, json!(1)).is_satisfied(&payload));
}

#[test]
fn test_empty_groupings() {
    let payload = AnswerPayload::new();
    assert!(Condition::All { all: vec![] }.is_satisfied(&payload));
    assert!(!Condition::Any { any: vec![] }.is_satisfied(&payload));
}

#[test]
fn test_nested_condition() {
    let condition = Condition::All {
        all: vec![
            eq_condition("intro", "Yes"),
            Condition::Any {
                any: vec![eq_condition("city", "Berlin"), eq_condition("city", "Kyoto")],
            },
        ],
    };
    let mut payload = answered("intro", "intro-input", "Yes");
    assert!(!condition.is_satisfied(&payload));
    payload.insert(
        "city".to_string(),
        AnswerEntry::Single(AnswerRecord::value("city-input", json!("Kyoto"))),
    );
    assert!(condition.is_satisfied(&payload));

    let negated = Condition::Not {
        not: Box::new(condition),
    };
    assert!(!negated.is_satisfied(&payload));
}

#[test]
fn test_interaction_scoped_comparison() {
    let mut payload = AnswerPayload::new();
    payload.insert(
        "toppings".to_string(),
        AnswerEntry::Many(vec![
            AnswerRecord::value("olives", json!("Olives")),
            AnswerRecord::value("peppers", json!("Peppers")),
        ]),
    );

    let scoped = Condition::Cmp(Comparison {
        block: "toppings".to_string(),
        interaction: Some("olives".to_string()),
        operator: ConditionOperator::Eq,
        operand: json!("Olives"),
    });
    assert!(scoped.is_satisfied(&payload));

    // Scoping to an interaction with no records behaves like unanswered.
    let empty_scope = Condition::Cmp(Comparison {
        block: "toppings".to_string(),
        interaction: Some("mushrooms".to_string()),
        operator: ConditionOperator::Neq,
        operand: json!("Olives"),
    });
    assert!(!empty_scope.is_satisfied(&payload));
}

#[test]
fn test_multi_record_entry_matches_any_record() {
    let mut payload = AnswerPayload::new();
    payload.insert(
        "toppings".to_string(),
        AnswerEntry::Many(vec![
            AnswerRecord::value("olives", json!("Olives")),
            AnswerRecord::value("peppers", json!("Peppers")),
        ]),
    );
    let eq_peppers = comparison("toppings", ConditionOperator::Eq, json!("Peppers"));
    assert!(eq_peppers.is_satisfied(&payload));

    // Neq holds only when no record matches.
    let neq_olives = comparison("toppings", ConditionOperator::Neq, json!("Olives"));
    assert!(!neq_olives.is_satisfied(&payload));
    let neq_mushrooms = comparison("toppings", ConditionOperator::Neq, json!("Mushrooms"));
    assert!(neq_mushrooms.is_satisfied(&payload));
}

#[test]
fn test_file_records_compare_by_name() {
    let mut payload = AnswerPayload::new();
    payload.insert(
        "cv".to_string(),
        AnswerEntry::Many(vec![AnswerRecord::file(
            "cv-input",
            test_file("resume.pdf", 16),
        )]),
    );
    assert!(
        comparison("cv", ConditionOperator::Contains, json!("resume")).is_satisfied(&payload)
    );
}

#[test]
fn test_goto_first_match_wins() {
    let mut row = input_block("pick", BlockKind::Radio, 0);
    row.logics = vec![
        WireLogic {
            condition: eq_condition("pick", "A"),
            target: "first".to_string(),
        },
        WireLogic {
            condition: comparison("pick", ConditionOperator::Answered, json!(null)),
            target: "second".to_string(),
        },
    ];
    let storyboard = StoryboardDocument { blocks: vec![row] }
        .into_storyboard()
        .expect("document converts");
    let block = storyboard.find_block("pick").expect("block exists");

    let payload = answered("pick", "pick-input", "A");
    let decision = kaiwa::logic::evaluate_goto(block, &payload).expect("a rule matches");
    assert_eq!(decision.target, "first");
    assert_eq!(decision.rule_index, 0);

    // Second rule catches any other answer.
    let payload = answered("pick", "pick-input", "B");
    let decision = kaiwa::logic::evaluate_goto(block, &payload).expect("a rule matches");
    assert_eq!(decision.target, "second");
    assert_eq!(decision.rule_index, 1);

    assert!(kaiwa::logic::evaluate_goto(block, &AnswerPayload::new()).is_none());
}

#[test]
fn test_disabled_block_is_never_visible() {
    let mut row = input_block("hidden", BlockKind::Short, 0);
    row.is_disabled = true;
    let storyboard = StoryboardDocument { blocks: vec![row] }
        .into_storyboard()
        .expect("document converts");
    let block = storyboard.find_block("hidden").expect("block exists");
    assert!(!kaiwa::logic::is_visible(block, &AnswerPayload::new()));
}

#[test]
fn test_formatter_shows_actual_answers() {
    let condition = eq_condition("color", "red");
    let unanswered = ConditionFormatter::format_condition(&condition, &AnswerPayload::new());
    assert_eq!(unanswered, "$color == \"red\" (was unanswered)");

    let payload = answered("color", "color-input", "blue");
    let formatted = ConditionFormatter::format_condition(&condition, &payload);
    assert_eq!(formatted, "$color == \"red\" (was \"blue\")");
}

#[test]
fn test_formatter_collapses_sequences() {
    let mut payload = AnswerPayload::new();
    payload.insert(
        "toppings".to_string(),
        AnswerEntry::Many(vec![
            AnswerRecord::value("olives", json!("Olives")),
            AnswerRecord::value("peppers", json!("Peppers")),
        ]),
    );
    let condition = comparison("toppings", ConditionOperator::Contains, json!("Olives"));
    let formatted = ConditionFormatter::format_condition(&condition, &payload);
    assert_eq!(
        formatted,
        "$toppings contains \"Olives\" (was [\"Olives\", \"Peppers\"])"
    );
}

#[test]
fn test_formatter_parenthesizes_by_precedence() {
    let condition = Condition::All {
        all: vec![
            eq_condition("a", "1"),
            Condition::Any {
                any: vec![eq_condition("b", "2"), eq_condition("c", "3")],
            },
        ],
    };
    let formatted = ConditionFormatter::format_condition(&condition, &AnswerPayload::new());
    assert_eq!(
        formatted,
        "$a == \"1\" (was unanswered) and ($b == \"2\" (was unanswered) or $c == \"3\" (was unanswered))"
    );

    // An `and` inside an `or` binds tighter and needs no parentheses.
    let condition = Condition::Any {
        any: vec![
            Condition::All {
                all: vec![eq_condition("a", "1"), eq_condition("b", "2")],
            },
            eq_condition("c", "3"),
        ],
    };
    let formatted = ConditionFormatter::format_condition(&condition, &AnswerPayload::new());
    assert!(!formatted.contains('('));
}

#[test]
fn test_condition_wire_format() {
    let raw = json!({
        "all": [
            { "block": "intro", "operator": "eq", "operand": "Yes" },
            { "not": { "block": "age", "operator": "lt", "operand": 18 } }
        ]
    });
    let condition: Condition = serde_json::from_value(raw).expect("condition parses");
    let mut payload = answered("intro", "intro-input", "Yes");
    payload.insert(
        "age".to_string(),
        AnswerEntry::Single(AnswerRecord::value("age-input", json!(21))),
    );
    assert!(condition.is_satisfied(&payload));

    payload.insert(
        "age".to_string(),
        AnswerEntry::Single(AnswerRecord::value("age-input", json!(16))),
    );
    assert!(!condition.is_satisfied(&payload));
}

#[test]
fn test_operator_without_operand_defaults_to_null() {
    let raw = json!({ "block": "intro", "operator": "answered" });
    let condition: Condition = serde_json::from_value(raw).expect("condition parses");
    assert!(condition.is_satisfied(&answered("intro", "intro-input", "Yes")));
    assert!(!condition.is_satisfied(&AnswerPayload::new()));
}
