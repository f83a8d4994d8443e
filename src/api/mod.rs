//! Backend abstraction for the forms service.
//!
//! A [`ConversationSession`](crate::session::ConversationSession) never talks
//! to the network itself. Everything it needs from the outside world goes
//! through the [`FormsBackend`] trait: the HTTP implementation for real
//! deployments, the in-memory one for tests, tools, and offline previews.

pub mod http;
pub mod memory;
pub mod types;

use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;

use crate::error::BackendError;
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
pub use types::*;

/// The operations a forms backend must provide to run a conversation.
#[async_trait]
pub trait FormsBackend: Send + Sync {
    /// Opens an answering session for a form, capturing the query parameters
    /// the visitor arrived with.
    async fn create_session(
        &self,
        form_id: &str,
        params: &[(String, String)],
    ) -> Result<SessionHandle, BackendError>;

    /// Fetches the public descriptor of a form.
    async fn fetch_form(&self, form_id: &str) -> Result<PublicForm, BackendError>;

    /// Fetches the storyboard document of a form.
    async fn fetch_storyboard(&self, form_id: &str) -> Result<StoryboardDocument, BackendError>;

    /// Sends one submission step. `expect_more_files` tells the backend to
    /// keep the session open because an upload step follows; the finalize
    /// step sends an empty payload with it unset.
    async fn submit(
        &self,
        form_id: &str,
        token: &str,
        payload: &SubmitPayload,
        expect_more_files: bool,
    ) -> Result<(), BackendError>;

    /// Transmits the staged files of a submission. Implementations report
    /// per-file progress through `progress` as bytes go out; a dropped
    /// receiver must not fail the upload.
    async fn upload_files(
        &self,
        form_id: &str,
        token: &str,
        uploads: UploadsPayload,
        progress: UnboundedSender<UploadEvent>,
    ) -> Result<(), BackendError>;
}
