//! HTTP implementation of the forms backend.
//!
//! Endpoint layout, relative to the base URL:
//!
//! - `POST forms/{id}/sessions` opens a session
//! - `GET  forms/{id}` serves the public form descriptor
//! - `GET  forms/{id}/storyboard` serves the storyboard document
//! - `POST forms/{id}/submissions` takes a submission step
//! - `POST forms/{id}/files` takes the multipart upload step
//!
//! File uploads are streamed in fixed-size chunks so per-file progress can be
//! reported while bytes are on the wire, the same way a browser client fires
//! upload progress events.

use std::time::Duration;

use ahash::AHashMap;
use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc::UnboundedSender;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::FormsBackend;
use super::types::{
    PublicForm, SessionHandle, StoryboardDocument, SubmitPayload, UploadEvent, UploadsPayload,
    WireAnswer,
};
use crate::error::BackendError;

/// Upload streams are re-chunked to this size; one progress event fires per
/// chunk handed to the transport.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Forms backend speaking HTTP to a real deployment.
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    /// Creates a backend for the service at `base_url`.
    ///
    /// Only the connection attempt is bounded by a timeout. Whole-request
    /// deadlines would cut off large file uploads on slow links.
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| BackendError::Network(err.to_string()))?;
        Self::with_client(client, base_url)
    }

    /// Creates a backend reusing a preconfigured client (proxies, custom TLS,
    /// stricter timeouts).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, BackendError> {
        let mut base = Url::parse(base_url).map_err(|err| BackendError::InvalidUrl {
            url: base_url.to_string(),
            message: err.to_string(),
        })?;
        // Url::join drops the last path segment unless the base ends in '/'.
        if !base.path().ends_with('/') {
            let padded = format!("{}/", base.path());
            base.set_path(&padded);
        }
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base.join(path).map_err(|err| BackendError::InvalidUrl {
            url: format!("{}{path}", self.base),
            message: err.to_string(),
        })
    }

    fn ensure_success(response: &reqwest::Response) -> Result<(), BackendError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            warn!(status = status.as_u16(), url = %response.url(), "backend rejected request");
            Err(BackendError::Http {
                status: status.as_u16(),
            })
        }
    }
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    params: &'a [(String, String)],
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    session_token: &'a str,
    expect_more_files: bool,
    answers: &'a AHashMap<String, WireAnswer>,
}

#[async_trait]
impl FormsBackend for HttpBackend {
    async fn create_session(
        &self,
        form_id: &str,
        params: &[(String, String)],
    ) -> Result<SessionHandle, BackendError> {
        let url = self.endpoint(&format!("forms/{form_id}/sessions"))?;
        debug!(%url, "opening session");
        let response = self
            .client
            .post(url)
            .json(&SessionRequest { params })
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;
        Self::ensure_success(&response)?;
        response
            .json::<SessionHandle>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }

    async fn fetch_form(&self, form_id: &str) -> Result<PublicForm, BackendError> {
        let url = self.endpoint(&format!("forms/{form_id}"))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;
        Self::ensure_success(&response)?;
        response
            .json::<PublicForm>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }

    async fn fetch_storyboard(&self, form_id: &str) -> Result<StoryboardDocument, BackendError> {
        let url = self.endpoint(&format!("forms/{form_id}/storyboard"))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;
        Self::ensure_success(&response)?;
        response
            .json::<StoryboardDocument>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }

    async fn submit(
        &self,
        form_id: &str,
        token: &str,
        payload: &SubmitPayload,
        expect_more_files: bool,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("forms/{form_id}/submissions"))?;
        debug!(%url, answers = payload.answers.len(), expect_more_files, "submitting answers");
        let response = self
            .client
            .post(url)
            .json(&SubmitRequest {
                session_token: token,
                expect_more_files,
                answers: &payload.answers,
            })
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;
        Self::ensure_success(&response)
    }

    async fn upload_files(
        &self,
        form_id: &str,
        token: &str,
        uploads: UploadsPayload,
        progress: UnboundedSender<UploadEvent>,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("forms/{form_id}/files"))?;
        let file_count = uploads.len();
        let total_bytes = uploads.total_bytes();

        let mut form = reqwest::multipart::Form::new().text("session_token", token.to_owned());
        for slot in uploads.slots {
            let bytes = slot.file.bytes().map_err(|err| BackendError::FileRead {
                file_name: slot.file.file_name.clone(),
                message: err.to_string(),
            })?;
            let length = bytes.len() as u64;
            let body =
                reqwest::Body::wrap_stream(progress_stream(bytes, slot.key.clone(), progress.clone()));
            let part = reqwest::multipart::Part::stream_with_length(body, length)
                .file_name(slot.file.file_name.clone());
            form = form.part(slot.key, part);
        }

        info!(file_count, total_bytes, "uploading answer files");
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;
        Self::ensure_success(&response)
    }
}

/// Cuts a file into chunks and reports the running byte count as each chunk
/// is pulled into the request body. Progress is cosmetic: a closed receiver
/// never fails the transfer.
fn progress_stream(
    mut bytes: Bytes,
    key: String,
    progress: UnboundedSender<UploadEvent>,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let mut chunks = Vec::with_capacity(bytes.len().div_ceil(UPLOAD_CHUNK_BYTES));
    let mut loaded = 0u64;
    while !bytes.is_empty() {
        let take = bytes.len().min(UPLOAD_CHUNK_BYTES);
        let chunk = bytes.split_to(take);
        loaded += take as u64;
        chunks.push((chunk, loaded));
    }
    futures::stream::iter(chunks.into_iter().map(move |(chunk, loaded)| {
        let _ = progress.unbounded_send(UploadEvent {
            key: key.clone(),
            loaded,
        });
        Ok(chunk)
    }))
}
