use thiserror::Error;

/// Errors that can occur while talking to a forms backend.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("Endpoint rejected the request with HTTP status {status}")]
    Http { status: u16 },

    #[error("Network transport failed: {0}")]
    Network(String),

    #[error("Failed to decode the server response: {0}")]
    Decode(String),

    #[error("Failed to read file '{file_name}' for upload: {message}")]
    FileRead { file_name: String, message: String },

    #[error("Invalid backend URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Errors that can occur when converting a wire storyboard document into a
/// kaiwa [`Storyboard`](crate::storyboard::Storyboard).
#[derive(Error, Debug, Clone)]
pub enum StoryboardConversionError {
    #[error("Duplicate block id '{0}' in storyboard document")]
    DuplicateBlockId(String),

    #[error("Block '{block_id}' has a malformed visibility condition: {message}")]
    InvalidCondition { block_id: String, message: String },

    #[error("Invalid storyboard data: {0}")]
    ValidationError(String),
}

/// Errors that can occur while bootstrapping a conversation session.
#[derive(Error, Debug, Clone)]
pub enum SessionInitError {
    #[error("Failed to load the public form descriptor: {0}")]
    Form(BackendError),

    #[error("Failed to open a session on the backend: {0}")]
    Session(BackendError),

    #[error("Failed to load the storyboard document: {0}")]
    Storyboard(BackendError),

    #[error("Failed to convert the storyboard document: {0}")]
    Conversion(StoryboardConversionError),
}

/// Errors that can occur during the multi-step submission protocol.
#[derive(Error, Debug, Clone)]
pub enum SubmitError {
    #[error("Cannot submit without an active backend session")]
    MissingContext,

    #[error("Submitting answers failed: {0}")]
    Submit(BackendError),

    #[error("Uploading answer files failed: {0}")]
    Upload(BackendError),
}

impl SubmitError {
    /// Whether the session is left in a state where calling
    /// [`next`](crate::session::ConversationSession::next) again can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SubmitError::MissingContext)
    }
}
