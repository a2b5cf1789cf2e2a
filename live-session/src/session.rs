//! One active conversation: turn state, live connection, tools and the
//! incremental summary, wired to the live session's event stream.

use crate::generator::TextGenerator;
use crate::live::{FunctionCall, FunctionResponse, LiveEvent, LiveHandle, LiveSession};
use crate::summary::{IncrementalSummary, UpdateOutcome};
use crate::tool_task::{AudioStream, ToolExecution};
use crate::turn::{Interruption, TurnPhase, TurnSnapshot, TurnState, UserInput};
use live_common::logging::generate_span_id;
use live_common::{Error, Result, SummaryConfig};
use live_tools::{ToolExecutor, ToolOutput};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

/// Per-conversation state.
pub struct Session {
    id: String,
    turn: Arc<Mutex<TurnState>>,
    live: LiveHandle,
    summary: Arc<IncrementalSummary>,
    tools: Arc<dyn ToolExecutor>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        summary_config: SummaryConfig,
        generator: Arc<dyn TextGenerator>,
        tools: Arc<dyn ToolExecutor>,
    ) -> Self {
        let id = id.into();
        let live = LiveHandle::new();
        let summary = IncrementalSummary::new(id.clone(), summary_config, generator, live.clone());
        Self {
            id,
            turn: Arc::new(Mutex::new(TurnState::new())),
            live,
            summary: Arc::new(summary),
            tools,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's incremental summary coordinator.
    pub fn summary(&self) -> &Arc<IncrementalSummary> {
        &self.summary
    }

    /// Attach the live connection once it is established.
    pub fn attach_live(&self, live: Arc<dyn LiveSession>) {
        if self.live.attach(live).is_some() {
            tracing::debug!(session_id = %self.id, "Replaced live session connection");
        }
    }

    pub fn detach_live(&self) -> Option<Arc<dyn LiveSession>> {
        self.live.detach()
    }

    pub fn is_live_attached(&self) -> bool {
        self.live.is_attached()
    }

    pub async fn snapshot(&self) -> TurnSnapshot {
        self.turn.lock().await.snapshot()
    }

    /// User audio or text arrived from the client.
    pub async fn on_user_input(&self) -> UserInput {
        let outcome = self.turn.lock().await.on_user_input();
        if let UserInput::Interrupted(interruption) = outcome {
            self.log_interruption("user", interruption);
        }
        outcome
    }

    pub async fn on_model_output(&self) -> bool {
        self.turn.lock().await.on_model_output()
    }

    pub async fn on_turn_complete(&self) -> bool {
        let completed = self.turn.lock().await.on_turn_complete();
        if !completed {
            tracing::debug!(session_id = %self.id, "Turn complete ignored while tool call pending");
        }
        completed
    }

    /// Interruption reported by the live service.
    pub async fn interrupt(&self) -> Option<Interruption> {
        let interruption = self.turn.lock().await.interrupt();
        if let Some(interruption) = interruption {
            self.log_interruption("service", interruption);
        }
        interruption
    }

    fn log_interruption(&self, source: &str, interruption: Interruption) {
        tracing::info!(
            session_id = %self.id,
            source,
            from = ?interruption.from,
            cancelled_tool = interruption.cancelled_tool,
            cancelled_audio = interruption.cancelled_audio,
            "Response interrupted"
        );
    }

    pub async fn set_audio_stream(&self, stream: AudioStream) {
        self.turn.lock().await.set_audio_stream(stream);
    }

    pub async fn clear_audio_stream(&self) -> bool {
        self.turn.lock().await.clear_audio_stream()
    }

    /// Buffer an input transcription and start a compaction cycle in the
    /// background when one is due.
    pub fn add_transcript(&self, text: &str) -> Option<JoinHandle<UpdateOutcome>> {
        self.summary.add_transcript(text);
        if !self.summary.should_attempt() {
            return None;
        }
        let summary = Arc::clone(&self.summary);
        Some(tokio::spawn(async move { summary.maybe_update().await }))
    }

    /// Run the model's function calls in a background task.
    ///
    /// The task is spawned and recorded under one turn-lock acquisition, so
    /// it cannot report completion before its handle exists.
    pub async fn dispatch_tool_calls(&self, calls: Vec<FunctionCall>) -> Result<Uuid> {
        if calls.is_empty() {
            return Err(Error::InvalidTransition("tool call without function calls".into()));
        }

        let mut turn = self.turn.lock().await;
        if !turn.can_begin_tool_call() {
            let reason = if turn.tool_execution().is_some() {
                "a tool call is already in flight".to_string()
            } else {
                format!("tool call while {:?}", turn.phase())
            };
            drop(turn);
            tracing::warn!(session_id = %self.id, reason = %reason, "Rejected tool call");
            self.reject_tool_calls(&calls, &reason).await;
            return Err(Error::InvalidTransition(reason));
        }

        let id = Uuid::new_v4();
        let run = ToolRun {
            id,
            session_id: self.id.clone(),
            calls: calls.clone(),
            tools: Arc::clone(&self.tools),
            live: self.live.clone(),
            turn: Arc::clone(&self.turn),
        };
        let span = live_common::session_span!(self.id, tool_execution = %id);
        let task = tokio::spawn(run.execute().instrument(span));
        let execution = ToolExecution::new(id, calls, task);
        tracing::info!(
            session_id = %self.id,
            tool_execution = %id,
            tools = ?execution.tool_names(),
            "Dispatched tool calls"
        );
        turn.begin_tool_call(execution)?;
        Ok(id)
    }

    /// Answer every call with an error so the model is not left waiting.
    async fn reject_tool_calls(&self, calls: &[FunctionCall], reason: &str) {
        let Some(live) = self.live.get() else {
            return;
        };
        let responses = calls
            .iter()
            .map(|call| FunctionResponse {
                id: call.id.clone(),
                name: call.name.clone(),
                response: ToolOutput::failure(format!("Tool call rejected: {reason}")).into_value(),
            })
            .collect();
        if let Err(e) = live.send_tool_response(responses).await {
            tracing::warn!(session_id = %self.id, error = %e, "Failed to send tool rejection");
        }
    }

    /// Hand the running summary to the model for the question phase.
    ///
    /// The injected prompt asks for a response, so an Idle session starts a
    /// turn first and tool calls in that response are accepted. The turn is
    /// rolled back when nothing was sent.
    pub async fn inject_summary_for_transition(&self) -> Result<bool> {
        let started = {
            let mut turn = self.turn.lock().await;
            turn.phase() == TurnPhase::Idle && turn.on_user_input() == UserInput::TurnStarted
        };

        let result = self.summary.inject_summary_for_transition().await;
        if started && !matches!(result, Ok(true)) {
            self.turn.lock().await.on_turn_complete();
        }
        result
    }

    /// React to one event from the live session.
    pub async fn handle_event(&self, event: LiveEvent) -> Result<()> {
        match event {
            LiveEvent::ModelText(_) | LiveEvent::ModelAudio(_) => {
                self.on_model_output().await;
            }
            LiveEvent::InputTranscription(text) => {
                drop(self.add_transcript(&text));
            }
            LiveEvent::OutputTranscription(text) => {
                tracing::debug!(session_id = %self.id, chars = text.chars().count(), "Output transcription");
            }
            LiveEvent::ToolCall(calls) => {
                self.dispatch_tool_calls(calls).await?;
            }
            LiveEvent::TurnComplete => {
                self.on_turn_complete().await;
            }
            LiveEvent::Interrupted => {
                self.interrupt().await;
            }
        }
        Ok(())
    }

    /// Cancel outstanding work and drop the live connection.
    pub async fn close(&self) {
        self.turn.lock().await.shutdown();
        self.live.detach();
        tracing::info!(session_id = %self.id, "Session closed");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("live", &self.live)
            .field("summary", &self.summary)
            .finish()
    }
}

/// Everything a tool task needs, owned so the task does not keep the
/// session alive.
struct ToolRun {
    id: Uuid,
    session_id: String,
    calls: Vec<FunctionCall>,
    tools: Arc<dyn ToolExecutor>,
    live: LiveHandle,
    turn: Arc<Mutex<TurnState>>,
}

impl ToolRun {
    async fn execute(self) {
        let run_id = generate_span_id();
        let mut responses = Vec::with_capacity(self.calls.len());
        for call in &self.calls {
            tracing::info!(
                session_id = %self.session_id,
                run_id = %run_id,
                tool = %call.name,
                "Executing tool"
            );
            let output = self.tools.execute(&call.name, &call.args).await;
            if let Some(error) = output.error() {
                tracing::warn!(
                    session_id = %self.session_id,
                    run_id = %run_id,
                    tool = %call.name,
                    error = %error,
                    "Tool returned an error"
                );
            }
            responses.push(FunctionResponse {
                id: call.id.clone(),
                name: call.name.clone(),
                response: output.into_value(),
            });
        }

        match self.live.get() {
            Some(live) => {
                if let Err(e) = live.send_tool_response(responses).await {
                    tracing::warn!(
                        session_id = %self.session_id,
                        run_id = %run_id,
                        error = %e,
                        "Failed to send tool response"
                    );
                }
            }
            None => {
                tracing::warn!(session_id = %self.session_id, run_id = %run_id, "No live session for tool response");
            }
        }

        if !self.turn.lock().await.finish_tool_call(self.id) {
            tracing::debug!(session_id = %self.session_id, run_id = %run_id, "Stale tool completion ignored");
        }
    }
}
