//! Flattens the storyboard tree into the block queue navigation runs on.
//!
//! Group blocks are spliced out: their children take their place in sequence
//! order, carrying the group's gates with them. The flat queue is fixed for
//! the lifetime of a session; which of its blocks are visible at any moment
//! depends entirely on the answer payload.

use crate::logic::{self, AnswerPayload, Condition};
use crate::storyboard::{Block, Storyboard};

/// A leaf block in the flat queue together with the gates it inherited from
/// enclosing groups.
#[derive(Debug, Clone)]
pub struct QueueBlock {
    block: Block,
    inherited_disabled: bool,
    inherited_conditions: Vec<Condition>,
}

impl QueueBlock {
    pub fn id(&self) -> &str {
        &self.block.id
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Gates inherited from enclosing groups, outermost first.
    pub fn inherited_conditions(&self) -> &[Condition] {
        &self.inherited_conditions
    }

    /// Whether this block shows up under the given payload: its own gates and
    /// every inherited group gate must pass.
    pub fn is_visible(&self, payload: &AnswerPayload) -> bool {
        if self.inherited_disabled {
            return false;
        }
        if !self
            .inherited_conditions
            .iter()
            .all(|condition| condition.is_satisfied(payload))
        {
            return false;
        }
        logic::is_visible(&self.block, payload)
    }
}

/// Builds the flat block queue for a storyboard.
///
/// The result contains every leaf block exactly once, in depth-first sequence
/// order, with group gates folded into each entry. Siblings are ordered by
/// `sequence` whatever order they were authored in; ties keep authored order.
pub fn build_queue(storyboard: &Storyboard) -> Vec<QueueBlock> {
    let mut queue = Vec::new();
    flatten_into(&storyboard.blocks, false, &[], &mut queue);
    queue
}

fn flatten_into(
    blocks: &[Block],
    inherited_disabled: bool,
    inherited_conditions: &[Condition],
    out: &mut Vec<QueueBlock>,
) {
    let mut ordered: Vec<&Block> = blocks.iter().collect();
    ordered.sort_by_key(|block| block.sequence);
    for block in ordered {
        if block.is_group() {
            let disabled = inherited_disabled || block.is_disabled;
            let mut conditions = inherited_conditions.to_vec();
            if let Some(condition) = &block.visible_when {
                conditions.push(condition.clone());
            }
            flatten_into(&block.children, disabled, &conditions, out);
        } else {
            out.push(QueueBlock {
                block: block.clone(),
                inherited_disabled,
                inherited_conditions: inherited_conditions.to_vec(),
            });
        }
    }
}
