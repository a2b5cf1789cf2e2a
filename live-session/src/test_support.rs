//! In-memory fakes shared by the unit tests.

use crate::generator::{GenerateRequest, TextGenerator};
use crate::live::{ClientContent, FunctionResponse, LiveSession};
use async_trait::async_trait;
use live_common::{Error, Result};
use live_tools::{ToolExecutor, ToolOutput};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Live session that records everything sent to it.
#[derive(Default)]
pub struct RecordingLive {
    pub contents: Mutex<Vec<ClientContent>>,
    pub tool_responses: Mutex<Vec<Vec<FunctionResponse>>>,
    pub fail_sends: AtomicBool,
}

impl RecordingLive {
    pub fn failing() -> Self {
        let live = Self::default();
        live.fail_sends.store(true, Ordering::SeqCst);
        live
    }

    pub fn sent_contents(&self) -> Vec<ClientContent> {
        self.contents.lock().clone()
    }

    pub fn sent_tool_responses(&self) -> Vec<Vec<FunctionResponse>> {
        self.tool_responses.lock().clone()
    }
}

#[async_trait]
impl LiveSession for RecordingLive {
    async fn send_client_content(&self, content: ClientContent) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::LiveSession("connection closed".into()));
        }
        self.contents.lock().push(content);
        Ok(())
    }

    async fn send_tool_response(&self, responses: Vec<FunctionResponse>) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::LiveSession("connection closed".into()));
        }
        self.tool_responses.lock().push(responses);
        Ok(())
    }
}

/// Generator returning scripted replies in order, then empty strings.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            ..Self::default()
        }
    }

    pub fn failing(error: Error) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.prompt.clone()).collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Tool executor that echoes its arguments, optionally after a delay.
#[derive(Default)]
pub struct EchoTools {
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl EchoTools {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ToolExecutor for EchoTools {
    async fn execute(&self, tool_name: &str, args: &Map<String, Value>) -> ToolOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if tool_name == "missing" {
            return ToolOutput::failure(format!("Unknown tool: {tool_name}"));
        }
        ToolOutput::Success(Value::Object(args.clone()))
    }

    fn has_tool(&self, tool_name: &str) -> bool {
        tool_name != "missing"
    }
}
