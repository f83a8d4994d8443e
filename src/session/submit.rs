//! The multi-step submission protocol.
//!
//! Reaching the end of the queue triggers, in order:
//!
//! 1. a submission step carrying the wire answers, flagged when files follow
//! 2. the upload step, streaming every staged file while progress events are
//!    folded into the session's bookkeeping map
//! 3. a finalize step with an empty payload, closing the submission
//! 4. optionally, the CTA redirect the form configures
//!
//! Any failing step aborts the protocol with the session intact, so the whole
//! `next` call can simply be retried.

use ahash::AHashMap;
use futures::channel::mpsc;
use itertools::Itertools;
use tracing::{info, warn};
use url::Url;

use super::uploads::{self, UploadProgress};
use super::{ConversationSession, StepOutcome};
use crate::api::types::{
    PublicForm, SessionHandle, SubmitPayload, UploadSlot, UploadsPayload, WireAnswer,
    WireAnswerRecord,
};
use crate::error::SubmitError;
use crate::logic::{AnswerData, AnswerEntry, AnswerPayload, AnswerRecord};

impl ConversationSession {
    pub(super) async fn run_submit(&mut self) -> Result<StepOutcome, SubmitError> {
        let (Some(backend), Some(session)) = (self.backend.clone(), self.session.clone()) else {
            warn!("submission attempted without a backend session");
            return Err(SubmitError::MissingContext);
        };

        self.is_processing = true;
        self.uploads.clear();

        let form_id = self.form.uuid.clone();
        let (payload, staged) = build_submit_payload(&self.payload);
        let expect_files = !staged.is_empty();

        if let Err(err) = backend
            .submit(&form_id, &session.token, &payload, expect_files)
            .await
        {
            self.is_processing = false;
            return Err(SubmitError::Submit(err));
        }

        if expect_files {
            for slot in &staged.slots {
                self.uploads
                    .insert(slot.key.clone(), UploadProgress::new(slot.file.size_bytes));
            }

            let (sender, receiver) = mpsc::unbounded();
            let upload = backend.upload_files(&form_id, &session.token, staged, sender);
            let drain = uploads::drain_progress(receiver, &mut self.uploads);
            let (outcome, ()) = futures::join!(upload, drain);
            if let Err(err) = outcome {
                self.is_processing = false;
                warn!(error = %err, "upload step failed, submission can be retried");
                return Err(SubmitError::Upload(err));
            }

            if let Err(err) = backend
                .submit(&form_id, &session.token, &SubmitPayload::empty(), false)
                .await
            {
                self.is_processing = false;
                return Err(SubmitError::Submit(err));
            }
        }

        if self.form.use_cta_redirect {
            if let Some(url) = cta_redirect_url(&self.form, &session) {
                info!(%url, "submission complete, redirecting");
                // Still processing on purpose: the page is navigating away
                // and the session must not accept further input.
                return Ok(StepOutcome::Redirect(url));
            }
        }

        self.is_processing = false;
        self.is_submitted = true;
        info!("submission complete");
        Ok(StepOutcome::Submitted)
    }
}

/// Splits the runtime payload into the wire answers and the staged files.
///
/// A block holding file records is transmitted as a single record whose
/// payload is the comma-joined file names; the bytes themselves go out in the
/// upload step, keyed `actionId[index]` with `index` counting the files of
/// that action id in recording order.
fn build_submit_payload(payload: &AnswerPayload) -> (SubmitPayload, UploadsPayload) {
    let mut answers = AHashMap::with_capacity(payload.len());
    let mut slots: Vec<UploadSlot> = Vec::new();

    for (block_id, entry) in payload {
        if entry.has_files() {
            let mut per_action: AHashMap<&str, usize> = AHashMap::new();
            let mut file_action: Option<&str> = None;
            for record in entry.records() {
                if let AnswerData::File(file) = &record.data {
                    let counter = per_action.entry(record.action_id.as_str()).or_insert(0);
                    let index = *counter;
                    *counter += 1;
                    file_action.get_or_insert(record.action_id.as_str());
                    slots.push(UploadSlot {
                        key: uploads::upload_key(&record.action_id, index),
                        block_id: block_id.clone(),
                        action_id: record.action_id.clone(),
                        index,
                        file: file.clone(),
                    });
                }
            }
            let names = entry
                .records()
                .filter_map(|record| match &record.data {
                    AnswerData::File(file) => Some(file.file_name.as_str()),
                    AnswerData::Value(_) => None,
                })
                .join(", ");
            answers.insert(
                block_id.clone(),
                WireAnswer::One(WireAnswerRecord {
                    action_id: file_action.unwrap_or_default().to_string(),
                    payload: serde_json::Value::String(names),
                }),
            );
        } else {
            let wire = match entry {
                AnswerEntry::Single(record) => WireAnswer::One(to_wire(record)),
                AnswerEntry::Many(records) => {
                    WireAnswer::Many(records.iter().map(to_wire).collect())
                }
            };
            answers.insert(block_id.clone(), wire);
        }
    }

    // Payload map order is arbitrary; keep transfers and logs deterministic.
    slots.sort_by(|a, b| {
        (&a.block_id, &a.action_id, a.index).cmp(&(&b.block_id, &b.action_id, b.index))
    });

    (SubmitPayload { answers }, UploadsPayload { slots })
}

fn to_wire(record: &AnswerRecord) -> WireAnswerRecord {
    WireAnswerRecord {
        action_id: record.action_id.clone(),
        payload: match &record.data {
            AnswerData::Value(value) => value.clone(),
            AnswerData::File(file) => serde_json::Value::String(file.file_name.clone()),
        },
    }
}

/// Builds the CTA redirect target, appending the session token and the
/// captured visit params when the form asks for them. An unparseable link is
/// logged and skipped, degrading to the plain submitted outcome.
fn cta_redirect_url(form: &PublicForm, session: &SessionHandle) -> Option<Url> {
    let link = form.cta_link.as_deref()?;
    if link.is_empty() {
        return None;
    }
    let mut url = match Url::parse(link) {
        Ok(url) => url,
        Err(err) => {
            warn!(link, error = %err, "cta link is not a valid url");
            return None;
        }
    };
    let append_params = form.cta_append_params && !session.params.is_empty();
    if form.cta_append_session_id || append_params {
        let mut pairs = url.query_pairs_mut();
        if form.cta_append_session_id {
            pairs.append_pair("session_id", &session.token);
        }
        if append_params {
            for (key, value) in &session.params {
                pairs.append_pair(key, value);
            }
        }
    }
    Some(url)
}
