//! # Kaiwa - Conversational Form Runtime
//!
//! **Kaiwa** turns form storyboards into running conversations: one block on
//! screen at a time, branching driven by the answers given so far, and a
//! multi-step submission protocol with streamed file uploads at the end.
//! The runtime carries no UI. It is the state machine a renderer drives and
//! asks what to show next.
//!
//! ## Core Workflow
//!
//! The runtime is format-agnostic. It operates on a canonical internal model
//! of a "storyboard". The primary workflow is:
//!
//! 1.  **Load Your Document**: Fetch the storyboard document from a forms backend (or parse your own format into your own Rust structs).
//! 2.  **Convert to Kaiwa's Model**: The wire document converts via the `IntoStoryboard` trait; implement it for your structs to run any block source.
//! 3.  **Build the Queue**: The session flattens the block tree into the fixed flat queue navigation runs on. Which blocks are visible is recomputed from the answer payload on every query.
//! 4.  **Drive the Session**: Record answers for the current block, call `next` to advance through goto rules and visibility gates, and let the session run the submission protocol when the queue ends.
//!
//! ## Quick Start
//!
//! The following example runs a live session against a deployment.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kaiwa::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! // 1. Point a backend at your forms deployment.
//! let backend = Arc::new(HttpBackend::new("https://forms.example.com/api/")?);
//!
//! // 2. Bootstrap a session for one form, capturing the visit params.
//! let mut session = ConversationSession::init(
//!     backend,
//!     "7c9e6679-7425-40de-944b-e07fc1f90ae7",
//!     vec![("utm_source".into(), "newsletter".into())],
//! )
//! .await?;
//!
//! // 3. Record answers on the current block, then advance.
//! session.record_answer("name-input", "Ada".into());
//! let outcome = session.next().await?;
//!
//! // 4. At the end of the queue, `next` runs the submission protocol.
//! match outcome {
//!     StepOutcome::Continue => { /* render session.current_block() */ }
//!     StepOutcome::Submitted => println!("all done"),
//!     StepOutcome::Redirect(url) => println!("send the visitor to {url}"),
//!     StepOutcome::Busy => { /* a submission is already running */ }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! For tests, tools, and offline previews, swap [`HttpBackend`] for
//! [`InMemoryBackend`] or build the session with
//! [`ConversationSession::preview`] and no backend at all.
//!
//! [`HttpBackend`]: crate::api::HttpBackend
//! [`InMemoryBackend`]: crate::api::InMemoryBackend
//! [`ConversationSession::preview`]: crate::session::ConversationSession::preview

pub mod api;
pub mod data;
pub mod error;
pub mod logic;
pub mod prelude;
pub mod queue;
pub mod session;
pub mod storyboard;
