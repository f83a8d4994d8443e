//! In-memory forms backend for tests, tools, and offline previews.
//!
//! Behaves like a tiny deployment: it issues real session tokens, validates
//! them on submission, records everything it receives, and simulates chunked
//! upload progress. Failure injection switches let tests drive the error
//! paths of the submission protocol.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;
use uuid::Uuid;

use super::FormsBackend;
use super::types::{
    PublicForm, SessionHandle, StoryboardDocument, SubmitPayload, UploadEvent, UploadsPayload,
};
use crate::error::BackendError;

/// One submission step as the backend received it.
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub token: String,
    pub payload: SubmitPayload,
    pub expect_more_files: bool,
}

/// One uploaded file as the backend received it.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub key: String,
    pub file_name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Default)]
struct Recorder {
    sessions: Vec<SessionHandle>,
    submissions: Vec<RecordedSubmission>,
    uploads: Vec<RecordedUpload>,
}

/// Forms backend that serves a single fixed form from memory.
pub struct InMemoryBackend {
    form: PublicForm,
    document: StoryboardDocument,
    recorder: Mutex<Recorder>,
    fail_submissions: AtomicBool,
    fail_uploads: AtomicBool,
}

impl InMemoryBackend {
    pub fn new(form: PublicForm, document: StoryboardDocument) -> Self {
        Self {
            form,
            document,
            recorder: Mutex::new(Recorder::default()),
            fail_submissions: AtomicBool::new(false),
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent submission step fail with a network error.
    pub fn set_fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent upload step fail after reporting partial
    /// progress for the first file.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn sessions(&self) -> Vec<SessionHandle> {
        self.lock_recorder().sessions.clone()
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.lock_recorder().submissions.clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.lock_recorder().uploads.clone()
    }

    fn lock_recorder(&self) -> std::sync::MutexGuard<'_, Recorder> {
        self.recorder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn token_issued(&self, token: &str) -> bool {
        self.lock_recorder()
            .sessions
            .iter()
            .any(|session| session.token == token)
    }
}

#[async_trait]
impl FormsBackend for InMemoryBackend {
    async fn create_session(
        &self,
        _form_id: &str,
        params: &[(String, String)],
    ) -> Result<SessionHandle, BackendError> {
        let session = SessionHandle {
            token: Uuid::new_v4().to_string(),
            params: params.to_vec(),
        };
        self.lock_recorder().sessions.push(session.clone());
        Ok(session)
    }

    async fn fetch_form(&self, _form_id: &str) -> Result<PublicForm, BackendError> {
        Ok(self.form.clone())
    }

    async fn fetch_storyboard(&self, _form_id: &str) -> Result<StoryboardDocument, BackendError> {
        Ok(self.document.clone())
    }

    async fn submit(
        &self,
        _form_id: &str,
        token: &str,
        payload: &SubmitPayload,
        expect_more_files: bool,
    ) -> Result<(), BackendError> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(BackendError::Network("simulated submission failure".into()));
        }
        if !self.token_issued(token) {
            return Err(BackendError::Http { status: 401 });
        }
        self.lock_recorder().submissions.push(RecordedSubmission {
            token: token.to_string(),
            payload: payload.clone(),
            expect_more_files,
        });
        Ok(())
    }

    async fn upload_files(
        &self,
        _form_id: &str,
        token: &str,
        uploads: UploadsPayload,
        progress: UnboundedSender<UploadEvent>,
    ) -> Result<(), BackendError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            // Report half of the first file before dying so callers observe a
            // transfer that got underway.
            if let Some(slot) = uploads.slots.first() {
                let _ = progress.unbounded_send(UploadEvent {
                    key: slot.key.clone(),
                    loaded: slot.file.size_bytes / 2,
                });
            }
            return Err(BackendError::Network("simulated upload failure".into()));
        }
        if !self.token_issued(token) {
            return Err(BackendError::Http { status: 401 });
        }
        for slot in uploads.slots {
            let halfway = slot.file.size_bytes / 2;
            if halfway > 0 {
                let _ = progress.unbounded_send(UploadEvent {
                    key: slot.key.clone(),
                    loaded: halfway,
                });
            }
            let _ = progress.unbounded_send(UploadEvent {
                key: slot.key.clone(),
                loaded: slot.file.size_bytes,
            });
            self.lock_recorder().uploads.push(RecordedUpload {
                key: slot.key,
                file_name: slot.file.file_name,
                size_bytes: slot.file.size_bytes,
            });
        }
        Ok(())
    }
}
