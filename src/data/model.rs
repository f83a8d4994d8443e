use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use bytes::Bytes;

use crate::logic::FileAttachment;

/// A scripted run through a form, matching the expected JSON format for
/// replays: one entry per block, applied when navigation reaches it.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct AnswerScript {
    pub steps: Vec<ScriptedAnswer>,
}

/// One scripted answer, tagged by how it is recorded.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptedAnswer {
    /// Recorded through `record_answer`.
    Value {
        block: String,
        interaction: String,
        value: serde_json::Value,
    },
    /// Recorded through `record_multi_answer`, one toggle per value.
    Multi {
        block: String,
        interactions: Vec<ScriptedChoice>,
    },
    /// Recorded through `attach_files`, with synthetic content.
    Files {
        block: String,
        interaction: String,
        files: Vec<ScriptedFile>,
    },
    /// Reached and skipped without recording anything.
    Skip { block: String },
}

impl ScriptedAnswer {
    pub fn block(&self) -> &str {
        match self {
            ScriptedAnswer::Value { block, .. }
            | ScriptedAnswer::Multi { block, .. }
            | ScriptedAnswer::Files { block, .. }
            | ScriptedAnswer::Skip { block } => block,
        }
    }
}

/// A choice toggled on in a multi-select block.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScriptedChoice {
    pub interaction: String,
    pub value: serde_json::Value,
}

/// A file referenced by a script. Content is synthesized as zero bytes of the
/// given size, which is all upload bookkeeping needs.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScriptedFile {
    pub file_name: String,
    pub size_bytes: u64,
}

impl ScriptedFile {
    pub fn to_attachment(&self) -> FileAttachment {
        FileAttachment::from_bytes(
            self.file_name.clone(),
            Bytes::from(vec![0u8; self.size_bytes as usize]),
        )
    }
}

impl AnswerScript {
    /// Load a script from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let script = serde_json::from_str(&content)?;
        Ok(script)
    }

    /// The first scripted answer for a block, if any.
    pub fn for_block(&self, block_id: &str) -> Option<&ScriptedAnswer> {
        self.steps.iter().find(|step| step.block() == block_id)
    }

    /// Creates a small mock script when no file is provided.
    pub fn sample() -> Self {
        Self {
            steps: vec![
                ScriptedAnswer::Value {
                    block: "name".to_string(),
                    interaction: "name-input".to_string(),
                    value: serde_json::Value::String("Ada".to_string()),
                },
                ScriptedAnswer::Multi {
                    block: "toppings".to_string(),
                    interactions: vec![ScriptedChoice {
                        interaction: "olives".to_string(),
                        value: serde_json::Value::String("Olives".to_string()),
                    }],
                },
            ],
        }
    }
}
