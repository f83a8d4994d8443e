//! Common test utilities for building storyboard documents and sessions.
use std::sync::Arc;

use kaiwa::prelude::*;

/// Creates a bare wire block with no interactions or rules.
#[allow(dead_code)]
pub fn block(id: &str, kind: BlockKind, sequence: i64) -> WireBlock {
    WireBlock {
        id: id.to_string(),
        kind,
        is_required: false,
        is_disabled: false,
        options: serde_json::Map::new(),
        interactions: vec![],
        logics: vec![],
        sequence,
        parent_block: None,
    }
}

/// Creates a wire block with a single `{id}-input` interaction.
#[allow(dead_code)]
pub fn input_block(id: &str, kind: BlockKind, sequence: i64) -> WireBlock {
    let mut row = block(id, kind, sequence);
    row.interactions.push(interaction(&format!("{id}-input"), "", 0));
    row
}

#[allow(dead_code)]
pub fn interaction(id: &str, label: &str, sequence: i64) -> WireInteraction {
    WireInteraction {
        id: id.to_string(),
        label: label.to_string(),
        sequence,
        is_disabled: false,
        options: serde_json::Map::new(),
    }
}

/// `$block == operand` as a condition.
#[allow(dead_code)]
pub fn eq_condition(block: &str, operand: &str) -> Condition {
    Condition::Cmp(Comparison {
        block: block.to_string(),
        interaction: None,
        operator: ConditionOperator::Eq,
        operand: serde_json::Value::String(operand.to_string()),
    })
}

/// Attaches a visibility gate to a wire block's options bag.
#[allow(dead_code)]
pub fn gate(row: &mut WireBlock, condition: &Condition) {
    row.options.insert(
        "visible_when".to_string(),
        serde_json::to_value(condition).expect("condition serializes"),
    );
}

/// A payload with one single-record string answer, for direct logic tests.
#[allow(dead_code)]
pub fn answered(block: &str, action_id: &str, value: &str) -> AnswerPayload {
    let mut payload = AnswerPayload::new();
    payload.insert(
        block.to_string(),
        AnswerEntry::Single(AnswerRecord::value(
            action_id,
            serde_json::Value::String(value.to_string()),
        )),
    );
    payload
}

#[allow(dead_code)]
pub fn test_form() -> PublicForm {
    PublicForm {
        uuid: "form-under-test".to_string(),
        title: "Test form".to_string(),
        ..PublicForm::default()
    }
}

/// The minimal three-block survey: a short answer, a checkbox, and a
/// closing message.
#[allow(dead_code)]
pub fn survey_document() -> StoryboardDocument {
    let mut toppings = block("toppings", BlockKind::Checkbox, 1);
    toppings.interactions = vec![
        interaction("olives", "Olives", 0),
        interaction("mushrooms", "Mushrooms", 1),
        interaction("peppers", "Peppers", 2),
    ];
    StoryboardDocument {
        blocks: vec![
            input_block("name", BlockKind::Short, 0),
            toppings,
            block("outro", BlockKind::None, 2),
        ],
    }
}

/// A branching storyboard:
///
/// - `intro` (radio Yes/No) with a goto rule jumping to `outro` on "No"
/// - `details` group gated on "Yes", containing `city` and `age`
/// - `always`, an ungated block
/// - `outro`, a closing message
#[allow(dead_code)]
pub fn branching_document() -> StoryboardDocument {
    let mut intro = block("intro", BlockKind::Radio, 0);
    intro.interactions = vec![
        interaction("intro-yes", "Yes", 0),
        interaction("intro-no", "No", 1),
    ];
    intro.logics = vec![WireLogic {
        condition: eq_condition("intro", "No"),
        target: "outro".to_string(),
    }];

    let mut details = block("details", BlockKind::Group, 1);
    gate(&mut details, &eq_condition("intro", "Yes"));

    let mut city = input_block("city", BlockKind::Short, 0);
    city.parent_block = Some("details".to_string());
    let mut age = input_block("age", BlockKind::Number, 1);
    age.parent_block = Some("details".to_string());

    StoryboardDocument {
        blocks: vec![
            intro,
            details,
            city,
            age,
            input_block("always", BlockKind::Short, 2),
            block("outro", BlockKind::None, 3),
        ],
    }
}

/// A storyboard with a file block followed by a closing message.
#[allow(dead_code)]
pub fn upload_document() -> StoryboardDocument {
    StoryboardDocument {
        blocks: vec![
            input_block("cv", BlockKind::File, 0),
            block("outro", BlockKind::None, 1),
        ],
    }
}

/// Installs the tracing subscriber once so runtime logs show up in test
/// output when `RUST_LOG` asks for them.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Converts a document and wraps it in an offline preview session.
#[allow(dead_code)]
pub fn preview_session(document: StoryboardDocument) -> ConversationSession {
    init_tracing();
    let storyboard = document.into_storyboard().expect("document converts");
    ConversationSession::preview(test_form(), storyboard)
}

/// Boots a live session against a fresh in-memory backend.
#[allow(dead_code)]
pub async fn live_session(
    document: StoryboardDocument,
) -> (Arc<InMemoryBackend>, ConversationSession) {
    live_session_with_form(test_form(), document).await
}

#[allow(dead_code)]
pub async fn live_session_with_form(
    form: PublicForm,
    document: StoryboardDocument,
) -> (Arc<InMemoryBackend>, ConversationSession) {
    live_session_with_params(form, document, vec![]).await
}

#[allow(dead_code)]
pub async fn live_session_with_params(
    form: PublicForm,
    document: StoryboardDocument,
    params: Vec<(String, String)>,
) -> (Arc<InMemoryBackend>, ConversationSession) {
    init_tracing();
    let form_id = form.uuid.clone();
    let backend = Arc::new(InMemoryBackend::new(form, document));
    let session = ConversationSession::init(backend.clone(), &form_id, params)
        .await
        .expect("session initializes");
    (backend, session)
}

/// A small in-memory file for upload tests.
#[allow(dead_code)]
pub fn test_file(name: &str, size: usize) -> FileAttachment {
    FileAttachment::from_bytes(name, bytes::Bytes::from(vec![0u8; size]))
}
