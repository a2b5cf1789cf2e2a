//! Incremental summary coordinator.
//!
//! Keeps the live session's context bounded however long the conversation
//! runs. Transcript fragments are buffered; every `interval_secs` a
//! compaction cycle folds the buffer into one running summary with a
//! separate, non-streaming model call and pushes the result into the live
//! session under [`SUMMARY_PART_ID`], so the service replaces the previous
//! summary instead of accumulating turns.
//!
//! The buffer is drained before the model is called. A failed or empty
//! generation therefore drops that chunk of transcript: memory stays bounded
//! and the summary is best effort.

use crate::generator::{GenerateRequest, TextGenerator};
use crate::live::{ClientContent, LiveHandle};
use live_common::logging::generate_span_id;
use live_common::{Result, SummaryConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Instant;

/// Stable id under which the running summary is (re-)sent.
pub const SUMMARY_PART_ID: &str = "running_summary";

/// First part of every summary update.
pub const SUMMARY_MARKER: &str = "[Running summary updated]";

/// Result of one `maybe_update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Compaction is switched off.
    Disabled,
    /// The interval since the last cycle has not elapsed.
    TooSoon,
    /// Nothing buffered.
    EmptyBuffer,
    /// Fewer buffered characters than `min_chars` (only when enforced).
    BelowThreshold,
    /// Another cycle holds the guard.
    InProgress,
    /// No live session attached; the buffer was left untouched.
    NoLiveSession,
    /// The drained buffer held only whitespace; the model was not called.
    BlankChunk,
    /// The model failed or returned nothing; the summary is unchanged.
    GenerationFailed,
    /// The summary was replaced and pushed into the live session.
    Compacted,
    /// The summary was replaced locally but the push failed.
    PushFailed,
}

impl UpdateOutcome {
    /// Whether a compaction cycle actually ran.
    pub fn ran_cycle(self) -> bool {
        matches!(
            self,
            Self::BlankChunk | Self::GenerationFailed | Self::Compacted | Self::PushFailed
        )
    }
}

#[derive(Debug, Default)]
struct SummaryState {
    running_summary: String,
    buffer: Vec<String>,
    buffered_chars: usize,
    last_update: Option<Instant>,
}

/// Per-session incremental summary coordinator.
pub struct IncrementalSummary {
    session_id: String,
    config: SummaryConfig,
    generator: Arc<dyn TextGenerator>,
    live: LiveHandle,
    state: Mutex<SummaryState>,
    cycle: tokio::sync::Mutex<()>,
}

impl IncrementalSummary {
    pub fn new(
        session_id: impl Into<String>,
        config: SummaryConfig,
        generator: Arc<dyn TextGenerator>,
        live: LiveHandle,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            config,
            generator,
            live,
            state: Mutex::new(SummaryState::default()),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Buffer a transcript fragment. Empty input is ignored.
    pub fn add_transcript(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        state.buffered_chars += text.chars().count();
        state.buffer.push(text.to_string());
    }

    /// Latest compacted summary; empty before the first successful cycle.
    pub fn summary(&self) -> String {
        self.state.lock().running_summary.clone()
    }

    pub fn buffered_fragments(&self) -> Vec<String> {
        self.state.lock().buffer.clone()
    }

    pub fn buffered_chars(&self) -> usize {
        self.state.lock().buffered_chars
    }

    /// When the last cycle finished.
    pub fn last_update(&self) -> Option<Instant> {
        self.state.lock().last_update
    }

    /// Cheap gate evaluated before touching the cycle guard.
    fn precheck(&self) -> std::result::Result<(), UpdateOutcome> {
        if !self.config.enabled {
            return Err(UpdateOutcome::Disabled);
        }
        let state = self.state.lock();
        if !self.interval_elapsed(&state) {
            return Err(UpdateOutcome::TooSoon);
        }
        if state.buffer.is_empty() {
            return Err(UpdateOutcome::EmptyBuffer);
        }
        if self.config.enforce_min_chars && state.buffered_chars < self.config.min_chars {
            return Err(UpdateOutcome::BelowThreshold);
        }
        Ok(())
    }

    fn interval_elapsed(&self, state: &SummaryState) -> bool {
        state
            .last_update
            .map_or(true, |at| at.elapsed() >= self.config.interval())
    }

    /// Whether `maybe_update` would currently try to run a cycle.
    pub fn should_attempt(&self) -> bool {
        self.precheck().is_ok()
    }

    /// Run a compaction cycle if one is due.
    ///
    /// Concurrent callers never wait: only the caller that takes the guard
    /// runs a cycle, and it re-checks the interval under the guard.
    pub async fn maybe_update(&self) -> UpdateOutcome {
        if let Err(outcome) = self.precheck() {
            return outcome;
        }
        self.update_after_precheck().await
    }

    /// Guarded half of [`maybe_update`](Self::maybe_update). The pre-check
    /// result may be stale by now, so the interval is checked again.
    async fn update_after_precheck(&self) -> UpdateOutcome {
        let Ok(_guard) = self.cycle.try_lock() else {
            return UpdateOutcome::InProgress;
        };

        if !self.interval_elapsed(&self.state.lock()) {
            return UpdateOutcome::TooSoon;
        }

        let outcome = self.run_cycle().await;

        // A failed push leaves the clock alone so the next call can retry.
        if matches!(
            outcome,
            UpdateOutcome::Compacted
                | UpdateOutcome::GenerationFailed
                | UpdateOutcome::BlankChunk
                | UpdateOutcome::NoLiveSession
        ) {
            self.state.lock().last_update = Some(Instant::now());
        }
        outcome
    }

    async fn run_cycle(&self) -> UpdateOutcome {
        let cycle_id = generate_span_id();

        let Some(live) = self.live.get() else {
            tracing::debug!(session_id = %self.session_id, "No live session, skipping summary update");
            return UpdateOutcome::NoLiveSession;
        };

        let (chunk, fragments, previous) = {
            let mut state = self.state.lock();
            let fragments = std::mem::take(&mut state.buffer);
            state.buffered_chars = 0;
            let chunk = fragments.join("\n").trim().to_string();
            (chunk, fragments.len(), state.running_summary.clone())
        };
        if chunk.is_empty() {
            tracing::debug!(session_id = %self.session_id, fragments, "Dropped blank transcript chunk");
            return UpdateOutcome::BlankChunk;
        }

        tracing::info!(
            session_id = %self.session_id,
            cycle_id = %cycle_id,
            fragments,
            chars = chunk.chars().count(),
            "Running summary compaction"
        );

        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: build_prompt(&self.config.prompt, &previous, &chunk),
            max_output_tokens: self.config.max_output_tokens,
        };

        let summary = match self.generator.generate(request).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    cycle_id = %cycle_id,
                    generator = %self.generator.name(),
                    error = %e,
                    "Failed to generate incremental summary"
                );
                String::new()
            }
        };
        if summary.is_empty() {
            return UpdateOutcome::GenerationFailed;
        }

        self.state.lock().running_summary = summary.clone();

        let update = ClientContent::summary_update(SUMMARY_PART_ID, SUMMARY_MARKER, &summary);
        match live.send_client_content(update).await {
            Ok(()) => {
                tracing::info!(
                    session_id = %self.session_id,
                    cycle_id = %cycle_id,
                    summary_chars = summary.chars().count(),
                    "Running summary updated"
                );
                UpdateOutcome::Compacted
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    cycle_id = %cycle_id,
                    error = %e,
                    "Incremental summary update failed"
                );
                UpdateOutcome::PushFailed
            }
        }
    }

    /// Hand the summary to the model as a normal, generation-requesting turn.
    ///
    /// Used once, when the conversation moves to its question phase. Returns
    /// `Ok(false)` when there is no summary yet or no live session.
    pub async fn inject_summary_for_transition(&self) -> Result<bool> {
        let summary = self.summary();
        if summary.is_empty() {
            return Ok(false);
        }
        let Some(live) = self.live.get() else {
            return Ok(false);
        };

        let prompt = format!("{}\n\nSummary:\n{}", self.config.questions_prompt, summary);
        live.send_client_content(ClientContent::user_turn(prompt, true))
            .await?;

        tracing::info!(session_id = %self.session_id, "Injected summary for question phase");
        Ok(true)
    }
}

impl std::fmt::Debug for IncrementalSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("IncrementalSummary")
            .field("session_id", &self.session_id)
            .field("summary_chars", &state.running_summary.len())
            .field("buffered_fragments", &state.buffer.len())
            .field("live", &self.live)
            .finish()
    }
}

/// Compaction prompt: instruction, the summary to refine (if any), then the
/// new transcript chunk.
fn build_prompt(instruction: &str, previous: &str, chunk: &str) -> String {
    let mut prompt = instruction.to_string();
    if !previous.is_empty() {
        prompt.push_str("\n\nExisting summary to refine (merge and compress further):\n");
        prompt.push_str(previous);
    }
    prompt.push_str("\n\nNew transcript chunk to incorporate:\n");
    prompt.push_str(chunk);
    prompt
}
