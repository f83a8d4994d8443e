//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the
//! kaiwa crate. Import this module to get access to the core functionality
//! without having to import each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! // Use the prelude to get easy access to all the core types.
//! use kaiwa::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! // Load a storyboard document and preview it offline
//! let document_json = std::fs::read_to_string("path/to/storyboard.json")?;
//! let document: StoryboardDocument = serde_json::from_str(&document_json)?;
//!
//! let storyboard = document.into_storyboard()?;
//! let session = ConversationSession::preview(PublicForm::default(), storyboard);
//!
//! for queued in session.visible_queue() {
//!     println!("{} ({:?})", queued.block().label(), queued.block().kind);
//! }
//! # Ok(())
//! # }
//! ```

// Session runtime
pub use crate::session::{ConversationSession, StepOutcome, UploadProgress, upload_key};

// Storyboard model and conversion
pub use crate::storyboard::{
    Block, BlockKind, Interaction, IntoStoryboard, LogicRule, Storyboard,
};

// Queue building
pub use crate::queue::{QueueBlock, build_queue};

// Decision logic and answers
pub use crate::logic::{
    AnswerData, AnswerEntry, AnswerPayload, AnswerRecord, Comparison, Condition,
    ConditionFormatter, ConditionOperator, FileAttachment, FileSource, GotoDecision,
};

// Backend surface
pub use crate::api::{
    FormsBackend, HttpBackend, InMemoryBackend, PublicForm, SessionHandle, StoryboardDocument,
    SubmitPayload, UploadEvent, UploadSlot, UploadsPayload, WireAnswer, WireAnswerRecord,
    WireBlock, WireInteraction, WireLogic,
};

// Data structures
pub use crate::data::{AnswerScript, ScriptedAnswer, ScriptedChoice, ScriptedFile};

// Error types
pub use crate::error::{
    BackendError, SessionInitError, StoryboardConversionError, SubmitError,
};

// Map type used throughout the crate
pub use ahash::AHashMap;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
