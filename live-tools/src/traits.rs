//! Core tool executor trait and result type.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Outcome of one tool invocation.
///
/// Serializes as the tool's own JSON body on success and as
/// `{"error": "..."}` on failure, which is the shape handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Success(Value),
    Failure { error: String },
}

impl ToolOutput {
    /// Create a failed result.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Whether the tool call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Error message if the call failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error } => Some(error),
            Self::Success(_) => None,
        }
    }

    /// Convert into the JSON value sent back to the live session.
    pub fn into_value(self) -> Value {
        match self {
            Self::Success(value) => value,
            Self::Failure { error } => serde_json::json!({ "error": error }),
        }
    }
}

/// Executes tools requested by the live model.
///
/// Implementations never fail past this boundary: every problem is reported
/// through [`ToolOutput::Failure`].
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute `tool_name` with the given arguments.
    async fn execute(&self, tool_name: &str, args: &Map<String, Value>) -> ToolOutput;

    /// Whether a tool with this name is configured.
    fn has_tool(&self, tool_name: &str) -> bool;
}
