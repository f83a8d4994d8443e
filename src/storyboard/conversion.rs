use ahash::{AHashMap, AHashSet};
use tracing::warn;

use super::definition::{Block, Interaction, LogicRule, Storyboard};
use crate::api::types::{StoryboardDocument, WireBlock};
use crate::error::StoryboardConversionError;
use crate::logic::Condition;

/// A trait for custom data models that can be converted into a kaiwa
/// [`Storyboard`].
///
/// This is the primary extension point for making kaiwa format-agnostic. The
/// wire format served by the forms backend already implements it; by
/// implementing this trait on your own document structs, you provide a
/// translation layer that lets the conversation session run any block source.
///
/// # Example
///
/// ```rust,no_run
/// use kaiwa::prelude::*;
/// use kaiwa::error::StoryboardConversionError;
///
/// // 1. Define your custom structs for parsing your format.
/// struct MyQuestion { id: String, prompt: String }
/// struct MyQuestionnaire { questions: Vec<MyQuestion> }
///
/// // 2. Implement `IntoStoryboard` for your top-level struct.
/// impl IntoStoryboard for MyQuestionnaire {
///     fn into_storyboard(self) -> std::result::Result<Storyboard, StoryboardConversionError> {
///         let mut blocks = Vec::new();
///         for (position, question) in self.questions.into_iter().enumerate() {
///             let mut options = serde_json::Map::new();
///             options.insert("label".into(), question.prompt.into());
///             blocks.push(Block {
///                 id: question.id,
///                 kind: BlockKind::Short,
///                 sequence: position as i64,
///                 options,
///                 ..Block::default()
///             });
///         }
///
///         Ok(Storyboard { blocks })
///     }
/// }
/// ```
pub trait IntoStoryboard {
    /// Consumes the object and converts it into a kaiwa-compatible storyboard.
    fn into_storyboard(self) -> Result<Storyboard, StoryboardConversionError>;
}

impl IntoStoryboard for StoryboardDocument {
    /// Rebuilds the nested block tree from the flat rows the backend serves.
    ///
    /// Rows are grouped by `parent_block`, sorted by `sequence`, and spliced
    /// under their enclosing `group` block. Rows pointing at a missing or
    /// non-group parent are kept as top-level blocks rather than dropped, so a
    /// malformed document degrades to a longer conversation instead of a
    /// silently shorter one.
    fn into_storyboard(self) -> Result<Storyboard, StoryboardConversionError> {
        let mut seen = AHashSet::with_capacity(self.blocks.len());
        for block in &self.blocks {
            if !seen.insert(block.id.clone()) {
                return Err(StoryboardConversionError::DuplicateBlockId(block.id.clone()));
            }
        }

        let group_ids: AHashSet<String> = self
            .blocks
            .iter()
            .filter(|block| block.kind == crate::storyboard::BlockKind::Group)
            .map(|block| block.id.clone())
            .collect();

        let mut roots: Vec<WireBlock> = Vec::new();
        let mut by_parent: AHashMap<String, Vec<WireBlock>> = AHashMap::new();
        for block in self.blocks {
            match &block.parent_block {
                Some(parent) if group_ids.contains(parent) => {
                    by_parent.entry(parent.clone()).or_default().push(block);
                }
                Some(parent) => {
                    warn!(
                        block = %block.id,
                        parent = %parent,
                        "parent is missing or not a group, keeping block at top level"
                    );
                    roots.push(block);
                }
                None => roots.push(block),
            }
        }

        let mut blocks = Vec::with_capacity(roots.len());
        sort_rows(&mut roots);
        for row in roots {
            blocks.push(convert_block(row, &mut by_parent)?);
        }

        // Rows whose parent chain never reaches a top-level block (a group
        // cycle in a corrupt document) would otherwise vanish. Surface them
        // as top-level blocks instead.
        let mut orphans: Vec<WireBlock> = by_parent.into_values().flatten().collect();
        if !orphans.is_empty() {
            sort_rows(&mut orphans);
            let mut stranded = AHashMap::new();
            for row in orphans {
                warn!(block = %row.id, "block unreachable from any top-level group, keeping at top level");
                blocks.push(convert_block(row, &mut stranded)?);
            }
        }

        Ok(Storyboard { blocks })
    }
}

fn convert_block(
    row: WireBlock,
    by_parent: &mut AHashMap<String, Vec<WireBlock>>,
) -> Result<Block, StoryboardConversionError> {
    let visible_when = parse_visible_when(&row)?;

    let mut children = Vec::new();
    if let Some(mut rows) = by_parent.remove(&row.id) {
        sort_rows(&mut rows);
        for child in rows {
            children.push(convert_block(child, by_parent)?);
        }
    }

    let mut interactions: Vec<Interaction> = row
        .interactions
        .into_iter()
        .map(|interaction| Interaction {
            id: interaction.id,
            label: interaction.label,
            sequence: interaction.sequence,
            is_disabled: interaction.is_disabled,
            options: interaction.options,
        })
        .collect();
    interactions.sort_by_key(|interaction| interaction.sequence);

    // Goto rules keep their declared order: first match wins at runtime.
    let logics: Vec<LogicRule> = row
        .logics
        .into_iter()
        .map(|logic| LogicRule {
            condition: logic.condition,
            target: logic.target,
        })
        .collect();

    Ok(Block {
        id: row.id,
        kind: row.kind,
        is_required: row.is_required,
        is_disabled: row.is_disabled,
        options: row.options,
        interactions,
        logics,
        sequence: row.sequence,
        parent_block: row.parent_block,
        children,
        visible_when,
    })
}

/// Reads the optional visibility gate out of the options bag. Accepts both
/// the snake_case and camelCase spellings the builder UI has used over time.
fn parse_visible_when(row: &WireBlock) -> Result<Option<Condition>, StoryboardConversionError> {
    let raw = row
        .options
        .get("visible_when")
        .or_else(|| row.options.get("visibleWhen"));
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => serde_json::from_value::<Condition>(value.clone())
            .map(Some)
            .map_err(|err| StoryboardConversionError::InvalidCondition {
                block_id: row.id.clone(),
                message: err.to_string(),
            }),
    }
}

fn sort_rows(rows: &mut [WireBlock]) {
    rows.sort_by_key(|row| row.sequence);
}
