use serde::{Deserialize, Serialize};

use crate::logic::Condition;

/// The complete, canonical definition of a form's conversation, ready for
/// queue building. This is the target structure for any custom data model
/// conversion.
#[derive(Debug, Clone, Default)]
pub struct Storyboard {
    /// Top-level blocks in presentation order. Group blocks carry their
    /// children nested; every other kind is a leaf.
    pub blocks: Vec<Block>,
}

impl Storyboard {
    /// Total number of blocks, groups and leaves included.
    pub fn block_count(&self) -> usize {
        fn count(blocks: &[Block]) -> usize {
            blocks.iter().map(|block| 1 + count(&block.children)).sum()
        }
        count(&self.blocks)
    }

    /// Finds a block anywhere in the tree by id.
    pub fn find_block(&self, id: &str) -> Option<&Block> {
        fn search<'a>(blocks: &'a [Block], id: &str) -> Option<&'a Block> {
            for block in blocks {
                if block.id == id {
                    return Some(block);
                }
                if let Some(found) = search(&block.children, id) {
                    return Some(found);
                }
            }
            None
        }
        search(&self.blocks, id)
    }
}

/// Defines a single block (one conversational step) in the storyboard.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
    pub is_required: bool,
    /// Disabled blocks stay in the flat queue but never become visible.
    pub is_disabled: bool,
    /// Presentation settings the block kind interprets (label, placeholder,
    /// choice lists, ...). Opaque to the runtime.
    pub options: serde_json::Map<String, serde_json::Value>,
    /// The widgets this block renders, in presentation order.
    pub interactions: Vec<Interaction>,
    /// Goto rules, evaluated in declared order after the block is answered.
    pub logics: Vec<LogicRule>,
    pub sequence: i64,
    pub parent_block: Option<String>,
    /// Populated for `group` blocks only.
    pub children: Vec<Block>,
    /// Gate that must be satisfied for the block to be visible.
    pub visible_when: Option<Condition>,
}

impl Block {
    pub fn is_group(&self) -> bool {
        self.kind == BlockKind::Group
    }

    /// The display label, falling back to the block id when the options bag
    /// does not carry one.
    pub fn label(&self) -> &str {
        self.options
            .get("label")
            .and_then(|value| value.as_str())
            .unwrap_or(&self.id)
    }
}

/// Every block kind the runtime understands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// A plain message with nothing to answer.
    #[default]
    None,
    Short,
    Long,
    Email,
    Phone,
    Link,
    Number,
    Secret,
    File,
    Checkbox,
    Radio,
    Consent,
    Rating,
    Scale,
    Date,
    Group,
}

impl BlockKind {
    /// Whether answers of this kind are recorded as a sequence of records
    /// rather than a single one.
    pub fn is_multi(&self) -> bool {
        matches!(self, BlockKind::Checkbox | BlockKind::File)
    }
}

/// Defines one widget inside a block.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    /// The action id answers produced by this widget are recorded under.
    pub id: String,
    pub label: String,
    pub sequence: i64,
    pub is_disabled: bool,
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Defines a goto rule: when `condition` holds, navigation jumps to `target`
/// instead of advancing to the next visible block.
#[derive(Debug, Clone)]
pub struct LogicRule {
    pub condition: Condition,
    pub target: String,
}
