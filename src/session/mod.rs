//! The conversation session: the state machine a renderer drives.
//!
//! A session owns the flat block queue, the answer payload, and the current
//! position. Renderers call the recording operations as the visitor answers,
//! then [`next`](ConversationSession::next) to advance; everything else
//! (which blocks are visible, where navigation lands, when submission
//! happens) is derived from the payload on demand.
//!
//! Navigation is defensive throughout: an out-of-range jump, a goto to a
//! hidden block, or a payload change that hides the current block are logged
//! and absorbed, never surfaced as errors.

mod submit;
mod uploads;

pub use uploads::{UploadProgress, upload_key};

use std::sync::Arc;

use ahash::AHashMap;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::FormsBackend;
use crate::api::types::{PublicForm, SessionHandle};
use crate::error::{SessionInitError, SubmitError};
use crate::logic::{self, AnswerEntry, AnswerPayload, AnswerRecord, FileAttachment, GotoDecision};
use crate::queue::{QueueBlock, build_queue};
use crate::storyboard::{Block, IntoStoryboard, Storyboard};

#[cfg(feature = "debug-tools")]
use crate::logic::ConditionFormatter;

/// What a call to [`ConversationSession::next`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Navigation moved (or stayed put); the conversation continues.
    Continue,
    /// The submission protocol ran to completion.
    Submitted,
    /// Submission succeeded and the visitor should be sent to this URL.
    /// The session stays locked: the page is expected to navigate away.
    Redirect(Url),
    /// A previous `next` call is still mid-submission; nothing happened.
    Busy,
}

/// A running conversation over one form.
pub struct ConversationSession {
    backend: Option<Arc<dyn FormsBackend>>,
    form: PublicForm,
    session: Option<SessionHandle>,
    storyboard: Storyboard,
    queue: Vec<QueueBlock>,
    payload: AnswerPayload,
    uploads: AHashMap<String, UploadProgress>,
    current: Option<String>,
    is_processing: bool,
    is_submitted: bool,
}

impl ConversationSession {
    /// Bootstraps a live session: fetches the form descriptor, opens a
    /// backend session, loads and converts the storyboard. Any failure
    /// aborts initialization.
    pub async fn init(
        backend: Arc<dyn FormsBackend>,
        form_id: &str,
        params: Vec<(String, String)>,
    ) -> Result<Self, SessionInitError> {
        let form = backend
            .fetch_form(form_id)
            .await
            .map_err(SessionInitError::Form)?;
        let session = backend
            .create_session(form_id, &params)
            .await
            .map_err(SessionInitError::Session)?;
        let document = backend
            .fetch_storyboard(form_id)
            .await
            .map_err(SessionInitError::Storyboard)?;
        let storyboard = document
            .into_storyboard()
            .map_err(SessionInitError::Conversion)?;
        info!(
            form = %form.uuid,
            blocks = storyboard.block_count(),
            "conversation session ready"
        );
        Ok(Self::assemble(Some(backend), form, Some(session), storyboard))
    }

    /// Builds a session with no backend attached. Navigation and answer
    /// recording work normally; submission fails with
    /// [`SubmitError::MissingContext`].
    pub fn preview(form: PublicForm, storyboard: Storyboard) -> Self {
        Self::assemble(None, form, None, storyboard)
    }

    fn assemble(
        backend: Option<Arc<dyn FormsBackend>>,
        form: PublicForm,
        session: Option<SessionHandle>,
        storyboard: Storyboard,
    ) -> Self {
        let queue = build_queue(&storyboard);
        let payload = AnswerPayload::new();
        let current = queue
            .iter()
            .find(|block| block.is_visible(&payload))
            .map(|block| block.id().to_string());
        Self {
            backend,
            form,
            session,
            storyboard,
            queue,
            payload,
            uploads: AHashMap::new(),
            current,
            is_processing: false,
            is_submitted: false,
        }
    }

    pub fn form(&self) -> &PublicForm {
        &self.form
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    pub fn storyboard(&self) -> &Storyboard {
        &self.storyboard
    }

    /// The full flat queue, visible or not.
    pub fn queue(&self) -> &[QueueBlock] {
        &self.queue
    }

    pub fn payload(&self) -> &AnswerPayload {
        &self.payload
    }

    /// Per-file transfer state of the running (or last) upload step.
    pub fn upload_progress(&self) -> &AHashMap<String, UploadProgress> {
        &self.uploads
    }

    /// `(loaded, total)` bytes across every staged file.
    pub fn overall_upload_progress(&self) -> (u64, u64) {
        uploads::overall(&self.uploads)
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn is_submitted(&self) -> bool {
        self.is_submitted
    }

    /// Blocks visible under the current payload, in queue order.
    pub fn visible_queue(&self) -> Vec<&QueueBlock> {
        self.queue
            .iter()
            .filter(|block| block.is_visible(&self.payload))
            .collect()
    }

    /// Position of the current block in the visible queue. `None` when the
    /// current block has been hidden by an answer and not yet re-anchored.
    pub fn current_index(&self) -> Option<usize> {
        let current = self.current.as_deref()?;
        self.visible_queue()
            .iter()
            .position(|block| block.id() == current)
    }

    /// The block the renderer should present right now.
    pub fn current_block(&self) -> Option<&Block> {
        let current = self.current.as_deref()?;
        self.queue
            .iter()
            .find(|block| block.id() == current)
            .map(QueueBlock::block)
    }

    /// Records a single-record answer for an interaction of the current
    /// block, replacing whatever the block held before.
    pub fn record_answer(&mut self, interaction_id: &str, value: serde_json::Value) {
        let Some(block_id) = self.current.clone() else {
            warn!(interaction = interaction_id, "record_answer with no current block");
            return;
        };
        debug!(block = %block_id, interaction = interaction_id, "recording answer");
        self.payload.insert(
            block_id,
            AnswerEntry::Single(AnswerRecord::value(interaction_id, value)),
        );
    }

    /// Toggles one choice in the current block's sequence answer.
    ///
    /// A record for the same interaction already in the sequence is removed,
    /// unless `keep_checked` is `Some(true)`, in which case it is replaced in
    /// place with the new value. A block answered with a single record so far
    /// is restarted as a one-element sequence.
    pub fn record_multi_answer(
        &mut self,
        interaction_id: &str,
        value: serde_json::Value,
        keep_checked: Option<bool>,
    ) {
        let Some(block_id) = self.current.clone() else {
            warn!(interaction = interaction_id, "record_multi_answer with no current block");
            return;
        };
        let record = AnswerRecord::value(interaction_id, value);
        match self.payload.get_mut(&block_id) {
            Some(AnswerEntry::Many(records)) => {
                let existing = records
                    .iter()
                    .position(|held| held.action_id == record.action_id);
                match (existing, keep_checked) {
                    (Some(position), Some(true)) => records[position] = record,
                    (Some(position), _) => {
                        records.remove(position);
                    }
                    (None, _) => records.push(record),
                }
            }
            _ => {
                self.payload.insert(block_id, AnswerEntry::Many(vec![record]));
            }
        }
    }

    /// Stages files on the current block, one record per file. Files already
    /// staged for the same interaction are replaced.
    pub fn attach_files(&mut self, interaction_id: &str, files: Vec<FileAttachment>) {
        let Some(block_id) = self.current.clone() else {
            warn!(interaction = interaction_id, "attach_files with no current block");
            return;
        };
        let records: Vec<AnswerRecord> = files
            .into_iter()
            .map(|file| AnswerRecord::file(interaction_id, file))
            .collect();
        debug!(block = %block_id, files = records.len(), "staging files");
        match self.payload.get_mut(&block_id) {
            Some(AnswerEntry::Many(existing)) => {
                existing.retain(|held| held.action_id != interaction_id);
                existing.extend(records);
            }
            _ => {
                self.payload.insert(block_id, AnswerEntry::Many(records));
            }
        }
    }

    /// Jumps to a position in the visible queue. Out-of-range targets are
    /// logged and ignored.
    pub fn go_to_index(&mut self, index: usize) {
        if self.is_processing {
            warn!(index, "go_to_index ignored while a submission is running");
            return;
        }
        let visible = self.visible_ids();
        match visible.get(index) {
            Some(id) => {
                debug!(index, block = %id, "jumping");
                self.current = Some(id.clone());
            }
            None => warn!(index, visible = visible.len(), "go_to_index out of range"),
        }
    }

    /// Steps back one visible block. At the first block this stays put.
    pub fn back(&mut self) {
        if self.is_processing {
            warn!("back ignored while a submission is running");
            return;
        }
        let visible = self.visible_ids();
        match self.resolve_position(&visible) {
            Some(0) => debug!("back at first block, staying"),
            Some(index) => self.current = Some(visible[index - 1].clone()),
            None => {}
        }
    }

    /// Advances the conversation: runs the current block's goto rules, falls
    /// through to the next visible block, or, at the end of the queue, runs
    /// the submission protocol.
    pub async fn next(&mut self) -> Result<StepOutcome, SubmitError> {
        if self.is_processing {
            warn!("next ignored, submission already running");
            return Ok(StepOutcome::Busy);
        }
        if self.is_submitted {
            debug!("next after submission is a no-op");
            return Ok(StepOutcome::Submitted);
        }

        let visible = self.visible_ids();
        let anchor = self.current.clone();
        let Some(index) = self.resolve_position(&visible) else {
            return Ok(StepOutcome::Continue);
        };
        if self.current != anchor {
            // Re-anchoring after an answer hid the current block is a step of
            // its own; the renderer presents the re-anchored block first.
            return Ok(StepOutcome::Continue);
        }

        let current_id = visible[index].clone();
        if let Some(decision) = self.current_goto(&current_id) {
            return Ok(self.apply_goto(&visible, &current_id, decision));
        }

        if index + 1 < visible.len() {
            self.current = Some(visible[index + 1].clone());
            return Ok(StepOutcome::Continue);
        }

        info!(answers = self.payload.len(), "end of conversation, submitting");
        self.run_submit().await
    }

    fn visible_ids(&self) -> Vec<String> {
        self.queue
            .iter()
            .filter(|block| block.is_visible(&self.payload))
            .map(|block| block.id().to_string())
            .collect()
    }

    /// Index of the current block in `visible`, re-anchoring when an answer
    /// has hidden it: the first visible block at or after the current flat
    /// position wins, else the last visible one before it.
    fn resolve_position(&mut self, visible: &[String]) -> Option<usize> {
        if visible.is_empty() {
            warn!("no visible blocks under the current payload");
            self.current = None;
            return None;
        }
        let Some(current) = self.current.clone() else {
            // An answer can reveal blocks after a fully hidden start.
            self.current = Some(visible[0].clone());
            return Some(0);
        };
        if let Some(index) = visible.iter().position(|id| *id == current) {
            return Some(index);
        }

        let flat = |id: &str| self.queue.iter().position(|block| block.id() == id);
        let Some(current_flat) = flat(&current) else {
            warn!(block = %current, "current block missing from queue, re-anchoring to start");
            self.current = Some(visible[0].clone());
            return Some(0);
        };
        let index = visible
            .iter()
            .position(|id| flat(id).is_some_and(|position| position >= current_flat))
            .unwrap_or(visible.len() - 1);
        warn!(block = %current, anchored = %visible[index], "current block no longer visible, re-anchoring");
        self.current = Some(visible[index].clone());
        Some(index)
    }

    fn current_goto(&self, block_id: &str) -> Option<GotoDecision> {
        let block = self
            .queue
            .iter()
            .find(|block| block.id() == block_id)?
            .block();
        logic::evaluate_goto(block, &self.payload)
    }

    fn apply_goto(&mut self, visible: &[String], from: &str, decision: GotoDecision) -> StepOutcome {
        match visible.iter().position(|id| *id == decision.target) {
            Some(_) => {
                debug!(
                    from = %from,
                    to = %decision.target,
                    rule = decision.rule_index,
                    "goto rule matched"
                );
                #[cfg(feature = "debug-tools")]
                if let Some(rule) = self
                    .queue
                    .iter()
                    .find(|block| block.id() == from)
                    .and_then(|block| block.block().logics.get(decision.rule_index))
                {
                    eprintln!(
                        "[kaiwa] goto {} -> {}: {}",
                        from,
                        decision.target,
                        ConditionFormatter::format_condition(&rule.condition, &self.payload)
                    );
                }
                self.current = Some(decision.target);
                StepOutcome::Continue
            }
            None => {
                warn!(from = %from, target = %decision.target, "goto target not visible, staying put");
                StepOutcome::Continue
            }
        }
    }

    /// Prints the flat queue with each block's visibility under the current
    /// payload and the gates deciding it.
    #[cfg(feature = "debug-tools")]
    pub fn dump_queue(&self) {
        eprintln!("[kaiwa] queue ({} blocks):", self.queue.len());
        for (position, block) in self.queue.iter().enumerate() {
            let marker = if self.current.as_deref() == Some(block.id()) {
                '>'
            } else {
                ' '
            };
            let visibility = if block.is_visible(&self.payload) {
                "visible"
            } else {
                "hidden"
            };
            eprintln!("[kaiwa] {marker} {position:>3} {} ({visibility})", block.id());
            for condition in block.inherited_conditions() {
                eprintln!(
                    "[kaiwa]         group gate: {}",
                    ConditionFormatter::format_condition(condition, &self.payload)
                );
            }
            if let Some(condition) = &block.block().visible_when {
                eprintln!(
                    "[kaiwa]         gate: {}",
                    ConditionFormatter::format_condition(condition, &self.payload)
                );
            }
        }
    }
}
