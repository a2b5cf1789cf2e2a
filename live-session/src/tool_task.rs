//! Handles to in-flight work a session may have to cancel on barge-in.

use crate::live::FunctionCall;
use tokio::task::{AbortHandle, JoinHandle};
use uuid::Uuid;

/// An outstanding tool execution.
///
/// A tool-call message from the live model carries one or several function
/// calls; both shapes run as a single task that answers them together.
#[derive(Debug)]
pub enum ToolExecution {
    Single {
        id: Uuid,
        call: FunctionCall,
        task: JoinHandle<()>,
    },
    Batch {
        id: Uuid,
        calls: Vec<FunctionCall>,
        task: JoinHandle<()>,
    },
}

impl ToolExecution {
    /// Wrap a spawned task, picking the variant from the number of calls.
    pub fn new(id: Uuid, mut calls: Vec<FunctionCall>, task: JoinHandle<()>) -> Self {
        if calls.len() == 1 {
            let call = calls.remove(0);
            Self::Single { id, call, task }
        } else {
            Self::Batch { id, calls, task }
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Single { id, .. } | Self::Batch { id, .. } => *id,
        }
    }

    /// The function calls this execution is answering.
    pub fn calls(&self) -> &[FunctionCall] {
        match self {
            Self::Single { call, .. } => std::slice::from_ref(call),
            Self::Batch { calls, .. } => calls,
        }
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.calls().iter().map(|c| c.name.as_str()).collect()
    }

    /// Abort the task. Consumes the handle so it cannot be cancelled twice.
    pub fn cancel(self) {
        self.task().abort();
    }

    fn task(&self) -> &JoinHandle<()> {
        match self {
            Self::Single { task, .. } | Self::Batch { task, .. } => task,
        }
    }
}

/// Outbound audio currently being streamed to the client.
#[derive(Debug)]
pub struct AudioStream {
    handle: AbortHandle,
}

impl AudioStream {
    pub fn new(handle: AbortHandle) -> Self {
        Self { handle }
    }

    /// Track the task that pumps audio to the client.
    pub fn from_task<T>(task: &JoinHandle<T>) -> Self {
        Self::new(task.abort_handle())
    }

    /// Whether the audio pump has stopped on its own or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the audio immediately.
    pub fn cancel(self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn call(name: &str) -> FunctionCall {
        FunctionCall {
            id: Some(format!("{name}-1")),
            name: name.into(),
            args: Default::default(),
        }
    }

    fn pending_task() -> JoinHandle<()> {
        tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        })
    }

    #[tokio::test]
    async fn single_call_variant() {
        let execution = ToolExecution::new(Uuid::new_v4(), vec![call("weather")], pending_task());
        assert!(matches!(execution, ToolExecution::Single { .. }));
        assert_eq!(execution.tool_names(), vec!["weather"]);
        execution.cancel();
    }

    #[tokio::test]
    async fn batch_variant_keeps_call_order() {
        let execution = ToolExecution::new(
            Uuid::new_v4(),
            vec![call("weather"), call("time")],
            pending_task(),
        );
        assert!(matches!(execution, ToolExecution::Batch { .. }));
        assert_eq!(execution.tool_names(), vec!["weather", "time"]);
        execution.cancel();
    }

    #[tokio::test]
    async fn cancel_aborts_task() {
        let task = pending_task();
        let abort = task.abort_handle();
        let execution = ToolExecution::new(Uuid::new_v4(), vec![call("weather")], task);
        assert!(!abort.is_finished());

        execution.cancel();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(abort.is_finished());
    }

    #[tokio::test]
    async fn audio_stream_cancel() {
        let task = pending_task();
        let stream = AudioStream::from_task(&task);
        assert!(!stream.is_finished());
        stream.cancel();
        let joined = task.await;
        assert!(joined.unwrap_err().is_cancelled());
    }
}
