//! Tests for session navigation and answer recording.
mod common;
use common::*;
use kaiwa::prelude::*;
use serde_json::json;
use tokio_test::block_on;

fn current_id(session: &ConversationSession) -> String {
    session.current_block().expect("a current block").id.clone()
}

#[test]
fn test_session_starts_on_first_visible_block() {
    let session = preview_session(branching_document());
    assert_eq!(current_id(&session), "intro");
    assert_eq!(session.current_index(), Some(0));
    assert_eq!(session.queue().len(), 5);
    assert_eq!(session.visible_queue().len(), 3);
}

#[test]
fn test_next_walks_the_visible_queue() {
    let mut session = preview_session(survey_document());
    assert_eq!(current_id(&session), "name");

    let outcome = block_on(session.next()).expect("step succeeds");
    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(current_id(&session), "toppings");

    let outcome = block_on(session.next()).expect("step succeeds");
    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(current_id(&session), "outro");
}

#[test]
fn test_answer_reveals_gated_group() {
    let mut session = preview_session(branching_document());
    session.record_answer("intro-yes", json!("Yes"));
    let visible: Vec<&str> = session
        .visible_queue()
        .iter()
        .map(|block| block.id())
        .collect();
    assert_eq!(visible, vec!["intro", "city", "age", "always", "outro"]);

    let outcome = block_on(session.next()).expect("step succeeds");
    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(current_id(&session), "city");
}

#[test]
fn test_goto_rule_overrides_linear_advance() {
    let mut session = preview_session(branching_document());
    session.record_answer("intro-no", json!("No"));
    let outcome = block_on(session.next()).expect("step succeeds");
    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(current_id(&session), "outro");
}

#[test]
fn test_goto_to_hidden_target_stays_put() {
    let mut intro = input_block("intro", BlockKind::Radio, 0);
    intro.logics = vec![WireLogic {
        condition: eq_condition("intro", "No"),
        target: "hidden".to_string(),
    }];
    let mut hidden = input_block("hidden", BlockKind::Short, 1);
    gate(&mut hidden, &eq_condition("never", "set"));
    let document = StoryboardDocument {
        blocks: vec![intro, hidden, input_block("outro", BlockKind::Short, 2)],
    };

    let mut session = preview_session(document);
    session.record_answer("intro-input", json!("No"));
    let outcome = block_on(session.next()).expect("step succeeds");
    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(current_id(&session), "intro");
}

#[test]
fn test_back_stops_at_first_block() {
    let mut session = preview_session(survey_document());
    session.back();
    assert_eq!(current_id(&session), "name");

    block_on(session.next()).expect("step succeeds");
    assert_eq!(current_id(&session), "toppings");
    session.back();
    assert_eq!(current_id(&session), "name");
}

#[test]
fn test_go_to_index_out_of_range_is_ignored() {
    let mut session = preview_session(survey_document());
    session.go_to_index(2);
    assert_eq!(current_id(&session), "outro");
    session.go_to_index(99);
    assert_eq!(current_id(&session), "outro");
    session.go_to_index(0);
    assert_eq!(current_id(&session), "name");
}

#[test]
fn test_record_answer_replaces_previous_value() {
    let mut session = preview_session(survey_document());
    session.record_answer("name-input", json!("Ada"));
    session.record_answer("name-input", json!("Grace"));

    let entry = session.payload().get("name").expect("answer recorded");
    assert_eq!(entry.len(), 1);
    match entry {
        AnswerEntry::Single(record) => {
            assert_eq!(record.action_id, "name-input");
            assert_eq!(record.comparable(), json!("Grace"));
        }
        other => panic!("unexpected entry shape: {other:?}"),
    }
}

#[test]
fn test_multi_answer_toggles_choices() {
    let mut session = preview_session(survey_document());
    block_on(session.next()).expect("step succeeds");
    assert_eq!(current_id(&session), "toppings");

    session.record_multi_answer("olives", json!("Olives"), None);
    session.record_multi_answer("peppers", json!("Peppers"), None);
    assert_eq!(session.payload().get("toppings").expect("entry").len(), 2);

    // A second toggle of the same interaction unchecks it.
    session.record_multi_answer("olives", json!("Olives"), None);
    let entry = session.payload().get("toppings").expect("entry");
    assert_eq!(entry.len(), 1);
    assert_eq!(entry.records().next().expect("record").action_id, "peppers");

    // Unchecking the last choice keeps an empty sequence entry.
    session.record_multi_answer("peppers", json!("Peppers"), None);
    let entry = session.payload().get("toppings").expect("entry");
    assert!(entry.is_empty());
}

#[test]
fn test_multi_answer_keep_checked_replaces_in_place() {
    let mut session = preview_session(survey_document());
    block_on(session.next()).expect("step succeeds");

    session.record_multi_answer("olives", json!("few"), None);
    session.record_multi_answer("peppers", json!("Peppers"), None);
    session.record_multi_answer("olives", json!("many"), Some(true));

    let entry = session.payload().get("toppings").expect("entry");
    assert_eq!(entry.len(), 2);
    let olives = entry
        .records()
        .find(|record| record.action_id == "olives")
        .expect("olives record");
    assert_eq!(olives.comparable(), json!("many"));
    // Position is preserved when replacing.
    assert_eq!(entry.records().next().expect("first").action_id, "olives");
}

#[test]
fn test_multi_answer_restarts_single_entry_as_sequence() {
    let mut session = preview_session(survey_document());
    session.record_answer("name-input", json!("Ada"));
    session.record_multi_answer("name-input", json!("Grace"), None);

    let entry = session.payload().get("name").expect("entry");
    match entry {
        AnswerEntry::Many(records) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].comparable(), json!("Grace"));
        }
        other => panic!("unexpected entry shape: {other:?}"),
    }
}

#[test]
fn test_attach_files_replaces_same_interaction_only() {
    let mut session = preview_session(upload_document());
    assert_eq!(current_id(&session), "cv");

    session.attach_files("cv-input", vec![test_file("draft.pdf", 8)]);
    session.attach_files(
        "cv-input",
        vec![test_file("final.pdf", 8), test_file("cover.pdf", 4)],
    );

    let entry = session.payload().get("cv").expect("entry");
    assert_eq!(entry.len(), 2);
    assert!(entry.has_files());
    let names: Vec<String> = entry
        .records()
        .map(|record| record.comparable().as_str().expect("name").to_string())
        .collect();
    assert_eq!(names, vec!["final.pdf", "cover.pdf"]);
}

#[test]
fn test_recording_with_no_current_block_is_a_noop() {
    let mut gated = input_block("gated", BlockKind::Short, 0);
    gate(&mut gated, &eq_condition("never", "set"));
    let document = StoryboardDocument { blocks: vec![gated] };
    let mut session = preview_session(document);

    assert!(session.current_block().is_none());
    session.record_answer("gated-input", json!("lost"));
    session.record_multi_answer("gated-input", json!("lost"), None);
    session.attach_files("gated-input", vec![test_file("lost.pdf", 4)]);
    assert!(session.payload().is_empty());

    let outcome = block_on(session.next()).expect("step succeeds");
    assert_eq!(outcome, StepOutcome::Continue);
}

#[test]
fn test_hiding_the_current_block_reanchors_forward() {
    // The detail block hides itself once answered "bye".
    let mut detail = input_block("detail", BlockKind::Short, 1);
    gate(
        &mut detail,
        &Condition::Not {
            not: Box::new(eq_condition("detail", "bye")),
        },
    );
    let document = StoryboardDocument {
        blocks: vec![
            input_block("switch", BlockKind::Short, 0),
            detail,
            input_block("always", BlockKind::Short, 2),
            block("outro", BlockKind::None, 3),
        ],
    };

    let mut session = preview_session(document);
    block_on(session.next()).expect("step succeeds");
    assert_eq!(current_id(&session), "detail");

    session.record_answer("detail-input", json!("bye"));
    assert_eq!(session.current_index(), None);

    // The re-anchor is the step: the next visible block gets presented.
    let outcome = block_on(session.next()).expect("step succeeds");
    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(current_id(&session), "always");
    assert_eq!(session.current_index(), Some(1));
}

#[test]
fn test_hiding_the_last_visible_block_reanchors_backward() {
    let mut tail = input_block("tail", BlockKind::Short, 1);
    gate(
        &mut tail,
        &Condition::Not {
            not: Box::new(eq_condition("tail", "bye")),
        },
    );
    let document = StoryboardDocument {
        blocks: vec![input_block("head", BlockKind::Short, 0), tail],
    };

    let mut session = preview_session(document);
    block_on(session.next()).expect("step succeeds");
    assert_eq!(current_id(&session), "tail");

    session.record_answer("tail-input", json!("bye"));
    let outcome = block_on(session.next()).expect("step succeeds");
    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(current_id(&session), "head");
}

#[test]
fn test_preview_submission_fails_without_backend() {
    let mut session = preview_session(survey_document());
    session.go_to_index(2);

    let err = block_on(session.next()).expect_err("preview cannot submit");
    assert!(matches!(err, kaiwa::error::SubmitError::MissingContext));
    assert!(!err.is_retryable());
    assert!(!session.is_processing());
    assert!(!session.is_submitted());
}
