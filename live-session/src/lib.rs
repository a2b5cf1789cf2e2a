//! Live Session - session concurrency and context compaction for live
//! multimodal conversations.
//!
//! Provides:
//! - A [`SessionRegistry`] owning every active [`Session`]
//! - The per-session turn/interruption state machine ([`TurnState`])
//! - The [`IncrementalSummary`] coordinator that periodically folds the
//!   transcript into one running summary and pushes it into the live session
//!   under a stable id
//! - The narrow interfaces to the external live session ([`LiveSession`]) and
//!   to the non-streaming compaction model ([`TextGenerator`])
//!
//! ## Example
//!
//! ```ignore
//! use live_session::SessionRegistry;
//!
//! let registry = SessionRegistry::new(config.summary.clone(), generator, tools);
//! let session = registry.create("conn-1").await?;
//! session.attach_live(live);
//! session.handle_event(LiveEvent::InputTranscription("Slide 1 covers X.".into())).await?;
//! ```

pub mod generator;
pub mod live;
pub mod registry;
pub mod session;
pub mod summary;
pub mod tool_task;
pub mod turn;

#[cfg(test)]
pub(crate) mod test_support;

pub use generator::{GeminiGenerator, GenerateRequest, TextGenerator};
pub use live::{
    ClientContent, Content, FunctionCall, FunctionResponse, LiveEvent, LiveHandle, LiveSession,
    Part,
};
pub use registry::SessionRegistry;
pub use session::Session;
pub use summary::{IncrementalSummary, UpdateOutcome, SUMMARY_MARKER, SUMMARY_PART_ID};
pub use tool_task::{AudioStream, ToolExecution};
pub use turn::{Interruption, TurnPhase, TurnSnapshot, TurnState, UserInput};
