//! Interface to the hosted live (duplex) generation session.
//!
//! Only the messages this crate produces and the events it consumes are
//! modelled here; the wire transport belongs to the caller.

use async_trait::async_trait;
use live_common::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// One text part of a content turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// One turn of client content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
    /// Stable id. Content re-sent with the same id replaces the earlier copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Content update pushed into the live session.
///
/// Serializes as `{"turns": [{"role", "parts": [{"text"}]}], "turn_complete"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContent {
    pub turns: Vec<Content>,
    /// Whether the service should start generating after this update.
    pub turn_complete: bool,
}

impl ClientContent {
    /// A single user turn with one text part.
    pub fn user_turn(text: impl Into<String>, turn_complete: bool) -> Self {
        Self {
            turns: vec![Content {
                role: "user".into(),
                parts: vec![Part::text(text)],
                id: None,
            }],
            turn_complete,
        }
    }

    /// Context-only update carrying the running summary under a stable id.
    /// Never requests generation.
    pub fn summary_update(id: &str, marker: &str, summary: &str) -> Self {
        Self {
            turns: vec![Content {
                role: "user".into(),
                parts: vec![Part::text(marker), Part::text(summary)],
                id: Some(id.to_string()),
            }],
            turn_complete: false,
        }
    }
}

/// A function call requested by the live model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// Result of a function call, returned to the live model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

/// Events emitted by the live session that this crate reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Partial or complete model text.
    ModelText(String),
    /// A chunk of model audio.
    ModelAudio(Vec<u8>),
    /// Transcription of the user's speech.
    InputTranscription(String),
    /// Transcription of the model's speech.
    OutputTranscription(String),
    /// The model wants one or more tools run.
    ToolCall(Vec<FunctionCall>),
    /// The model finished its turn.
    TurnComplete,
    /// The service detected a barge-in and stopped generating.
    Interrupted,
}

/// Outbound half of the live generation session.
#[async_trait]
pub trait LiveSession: Send + Sync {
    /// Push a content update.
    async fn send_client_content(&self, content: ClientContent) -> Result<()>;

    /// Return tool results for earlier function calls.
    async fn send_tool_response(&self, responses: Vec<FunctionResponse>) -> Result<()>;
}

/// Shared slot holding the session's live connection, if one is attached.
///
/// The session owns the slot; the summary coordinator and tool tasks read it
/// and simply skip their send when the connection is gone.
#[derive(Clone, Default)]
pub struct LiveHandle {
    inner: Arc<RwLock<Option<Arc<dyn LiveSession>>>>,
}

impl LiveHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a live connection, returning the one it replaced.
    pub fn attach(&self, live: Arc<dyn LiveSession>) -> Option<Arc<dyn LiveSession>> {
        self.inner.write().replace(live)
    }

    /// Detach the live connection (teardown).
    pub fn detach(&self) -> Option<Arc<dyn LiveSession>> {
        self.inner.write().take()
    }

    /// Current live connection.
    pub fn get(&self) -> Option<Arc<dyn LiveSession>> {
        self.inner.read().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.read().is_some()
    }
}

impl std::fmt::Debug for LiveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingLive;
    use serde_json::json;

    #[test]
    fn summary_update_wire_shape() {
        let content = ClientContent::summary_update("running_summary", "[marker]", "- point");
        assert_eq!(
            serde_json::to_value(&content).unwrap(),
            json!({
                "turns": [{
                    "role": "user",
                    "parts": [{ "text": "[marker]" }, { "text": "- point" }],
                    "id": "running_summary"
                }],
                "turn_complete": false
            })
        );
    }

    #[test]
    fn user_turn_omits_id() {
        let content = ClientContent::user_turn("Ask questions", true);
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["turn_complete"], json!(true));
        assert!(value["turns"][0].get("id").is_none());
    }

    #[test]
    fn function_call_args_default_to_empty() {
        let call: FunctionCall = serde_json::from_value(json!({ "name": "time" })).unwrap();
        assert!(call.args.is_empty());
        assert!(call.id.is_none());
    }

    #[test]
    fn live_handle_attach_detach() {
        let handle = LiveHandle::new();
        assert!(!handle.is_attached());
        assert!(handle.get().is_none());

        let live = Arc::new(RecordingLive::default());
        assert!(handle.attach(live).is_none());
        assert!(handle.is_attached());
        assert!(format!("{handle:?}").contains("attached: true"));

        let clone = handle.clone();
        assert!(clone.detach().is_some());
        assert!(!handle.is_attached());
    }
}
