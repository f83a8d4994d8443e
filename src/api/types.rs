use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::logic::{Condition, FileAttachment};
use crate::storyboard::BlockKind;

/// Public descriptor of a form as the backend exposes it to visitors.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PublicForm {
    pub uuid: String,
    #[serde(default)]
    pub title: String,
    /// Link the visitor is sent to after submitting, when
    /// `use_cta_redirect` is set.
    #[serde(default)]
    #[serde(alias = "ctaLink")]
    pub cta_link: Option<String>,
    #[serde(default)]
    #[serde(alias = "ctaAppendSessionId")]
    pub cta_append_session_id: bool,
    #[serde(default)]
    #[serde(alias = "ctaAppendParams")]
    pub cta_append_params: bool,
    #[serde(default)]
    #[serde(alias = "useCtaRedirect")]
    pub use_cta_redirect: bool,
}

/// An open answering session on the backend.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionHandle {
    pub token: String,
    /// Query parameters captured when the session was opened, echoed into the
    /// CTA redirect when the form asks for it.
    #[serde(default)]
    pub params: Vec<(String, String)>,
}

/// Storyboard block as the backend serves it: a flat row that references its
/// parent by id instead of nesting children.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WireBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    #[serde(alias = "isRequired")]
    pub is_required: bool,
    #[serde(default)]
    #[serde(alias = "isDisabled")]
    pub is_disabled: bool,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub interactions: Vec<WireInteraction>,
    #[serde(default)]
    pub logics: Vec<WireLogic>,
    #[serde(default)]
    pub sequence: i64,
    #[serde(default)]
    #[serde(alias = "parentBlock")]
    pub parent_block: Option<String>,
}

/// Widget row inside a [`WireBlock`].
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WireInteraction {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub sequence: i64,
    #[serde(default)]
    #[serde(alias = "isDisabled")]
    pub is_disabled: bool,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Goto rule row inside a [`WireBlock`].
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WireLogic {
    pub condition: Condition,
    pub target: String,
}

/// Complete storyboard document for one form.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StoryboardDocument {
    pub blocks: Vec<WireBlock>,
}

/// Answer record in submission wire format.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WireAnswerRecord {
    #[serde(rename = "actionId")]
    pub action_id: String,
    pub payload: serde_json::Value,
}

/// One block's entry in the submission body. Mirrors the runtime distinction
/// between single and sequence answers.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum WireAnswer {
    One(WireAnswerRecord),
    Many(Vec<WireAnswerRecord>),
}

/// Body of a submission step, keyed by block id. The finalize step of the
/// protocol sends an empty one.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SubmitPayload {
    pub answers: AHashMap<String, WireAnswer>,
}

impl SubmitPayload {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// One file staged for the upload step, with the bookkeeping key progress is
/// reported under.
#[derive(Debug, Clone)]
pub struct UploadSlot {
    /// Progress key in `actionId[index]` form.
    pub key: String,
    pub block_id: String,
    pub action_id: String,
    /// Position of this file among the files recorded for the same action id.
    pub index: usize,
    pub file: FileAttachment,
}

/// All files of one submission, in recording order.
#[derive(Debug, Clone, Default)]
pub struct UploadsPayload {
    pub slots: Vec<UploadSlot>,
}

impl UploadsPayload {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.slots.iter().map(|slot| slot.file.size_bytes).sum()
    }
}

/// Progress notification emitted by a backend while it transmits one file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadEvent {
    /// Upload key of the file this event belongs to, in `actionId[index]` form.
    pub key: String,
    /// Bytes transmitted so far for that file.
    pub loaded: u64,
}
