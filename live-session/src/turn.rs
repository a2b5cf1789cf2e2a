//! Turn-taking and interruption state machine for one session.
//!
//! ```text
//! Idle ──user input──▶ AwaitingResponse ──model output──▶ Streaming ──turn complete──▶ Idle
//!
//! AwaitingResponse | Streaming ──tool call──▶ ToolExecuting
//! ToolExecuting ──tool result──▶ Streaming (output seen) | AwaitingResponse (no output yet)
//! ```
//!
//! User input while Streaming or ToolExecuting is a barge-in: the audio
//! stream and any tool task are cancelled and the session waits for the
//! response to the new turn with `interrupted` raised.

use crate::tool_task::{AudioStream, ToolExecution};
use live_common::{Error, Result};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    #[default]
    Idle,
    AwaitingResponse,
    Streaming,
    ToolExecuting,
}

/// What a barge-in cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interruption {
    pub from: TurnPhase,
    pub cancelled_tool: bool,
    pub cancelled_audio: bool,
}

/// Effect of user input on the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInput {
    /// A new turn started from Idle.
    TurnStarted,
    /// More input for the turn already awaiting a response.
    Continued,
    /// The input pre-empted an in-flight response.
    Interrupted(Interruption),
}

/// Read-only view of the turn state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnSnapshot {
    pub phase: TurnPhase,
    pub is_receiving_response: bool,
    pub interrupted: bool,
    pub received_model_response: bool,
    pub tool_in_flight: bool,
    pub audio_active: bool,
}

#[derive(Debug, Default)]
pub struct TurnState {
    phase: TurnPhase,
    is_receiving_response: bool,
    interrupted: bool,
    received_model_response: bool,
    tool_execution: Option<ToolExecution>,
    audio_stream: Option<AudioStream>,
}

impl TurnState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn snapshot(&self) -> TurnSnapshot {
        TurnSnapshot {
            phase: self.phase,
            is_receiving_response: self.is_receiving_response,
            interrupted: self.interrupted,
            received_model_response: self.received_model_response,
            tool_in_flight: self.tool_execution.is_some(),
            audio_active: self
                .audio_stream
                .as_ref()
                .is_some_and(|stream| !stream.is_finished()),
        }
    }

    pub fn tool_execution(&self) -> Option<&ToolExecution> {
        self.tool_execution.as_ref()
    }

    /// User audio or text arrived.
    pub fn on_user_input(&mut self) -> UserInput {
        match self.phase {
            TurnPhase::Idle => {
                self.phase = TurnPhase::AwaitingResponse;
                self.interrupted = false;
                self.received_model_response = false;
                self.is_receiving_response = false;
                UserInput::TurnStarted
            }
            TurnPhase::AwaitingResponse => UserInput::Continued,
            TurnPhase::Streaming | TurnPhase::ToolExecuting => match self.interrupt() {
                Some(interruption) => UserInput::Interrupted(interruption),
                None => UserInput::Continued,
            },
        }
    }

    /// Raise the interrupted flag and cancel in-flight work.
    ///
    /// Returns `None` when Idle: there is nothing to interrupt.
    pub fn interrupt(&mut self) -> Option<Interruption> {
        if self.phase == TurnPhase::Idle {
            return None;
        }
        let from = self.phase;

        // Clearing the field and aborting the task happen together.
        let cancelled_tool = match self.tool_execution.take() {
            Some(execution) => {
                execution.cancel();
                true
            }
            None => false,
        };
        let cancelled_audio = match self.audio_stream.take() {
            Some(stream) => {
                stream.cancel();
                true
            }
            None => false,
        };

        self.interrupted = true;
        self.received_model_response = false;
        self.is_receiving_response = false;
        self.phase = TurnPhase::AwaitingResponse;

        Some(Interruption {
            from,
            cancelled_tool,
            cancelled_audio,
        })
    }

    /// A chunk of model output (text or audio) arrived.
    ///
    /// Returns true for the first output of the turn.
    pub fn on_model_output(&mut self) -> bool {
        let first = !self.received_model_response;
        self.received_model_response = true;
        self.is_receiving_response = true;
        match self.phase {
            TurnPhase::Idle | TurnPhase::AwaitingResponse => self.phase = TurnPhase::Streaming,
            // Output keeps flowing into the turn; the tool result resumes it.
            TurnPhase::Streaming | TurnPhase::ToolExecuting => {}
        }
        first
    }

    /// Whether a tool call may start now.
    pub fn can_begin_tool_call(&self) -> bool {
        self.tool_execution.is_none()
            && matches!(
                self.phase,
                TurnPhase::AwaitingResponse | TurnPhase::Streaming
            )
    }

    /// Record an outstanding tool execution.
    ///
    /// The audio stream is left alone: it is suspended, not discarded. A
    /// rejected execution is cancelled before the error is returned.
    pub fn begin_tool_call(&mut self, execution: ToolExecution) -> Result<()> {
        if !self.can_begin_tool_call() {
            let reason = if self.tool_execution.is_some() {
                "a tool call is already in flight".to_string()
            } else {
                format!("tool call while {:?}", self.phase)
            };
            execution.cancel();
            return Err(Error::InvalidTransition(reason));
        }
        self.tool_execution = Some(execution);
        self.phase = TurnPhase::ToolExecuting;
        Ok(())
    }

    /// The tool execution `id` delivered its results.
    ///
    /// Returns false, changing nothing, when `id` is not the execution on
    /// record (it was cancelled or superseded).
    pub fn finish_tool_call(&mut self, id: Uuid) -> bool {
        match &self.tool_execution {
            Some(execution) if execution.id() == id => {}
            _ => return false,
        }
        self.tool_execution = None;
        self.phase = if self.received_model_response {
            TurnPhase::Streaming
        } else {
            TurnPhase::AwaitingResponse
        };
        true
    }

    /// The service finished its turn.
    ///
    /// Ignored (returns false) while a tool call is outstanding.
    pub fn on_turn_complete(&mut self) -> bool {
        if self.tool_execution.is_some() {
            return false;
        }
        self.phase = TurnPhase::Idle;
        self.is_receiving_response = false;
        true
    }

    /// Track the outbound audio stream, cancelling any previous one.
    pub fn set_audio_stream(&mut self, stream: AudioStream) {
        if let Some(previous) = self.audio_stream.replace(stream) {
            previous.cancel();
        }
    }

    /// Forget the audio stream after it finished playing.
    pub fn clear_audio_stream(&mut self) -> bool {
        self.audio_stream.take().is_some()
    }

    /// Cancel everything and return to Idle. Used on teardown.
    pub fn shutdown(&mut self) {
        if let Some(execution) = self.tool_execution.take() {
            execution.cancel();
        }
        if let Some(stream) = self.audio_stream.take() {
            stream.cancel();
        }
        self.phase = TurnPhase::Idle;
        self.is_receiving_response = false;
    }
}
