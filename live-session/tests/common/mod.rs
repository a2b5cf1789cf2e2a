//! Fakes for the live session and the compaction model.

#![allow(dead_code)]

use async_trait::async_trait;
use live_common::{Error, Result};
use live_session::{ClientContent, FunctionResponse, GenerateRequest, LiveSession, TextGenerator};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct FakeLive {
    contents: Mutex<Vec<ClientContent>>,
    tool_responses: Mutex<Vec<Vec<FunctionResponse>>>,
    pub closed: AtomicBool,
}

impl FakeLive {
    pub fn contents(&self) -> Vec<ClientContent> {
        self.contents.lock().clone()
    }

    pub fn tool_responses(&self) -> Vec<Vec<FunctionResponse>> {
        self.tool_responses.lock().clone()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::LiveSession("socket closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LiveSession for FakeLive {
    async fn send_client_content(&self, content: ClientContent) -> Result<()> {
        self.check_open()?;
        self.contents.lock().push(content);
        Ok(())
    }

    async fn send_tool_response(&self, responses: Vec<FunctionResponse>) -> Result<()> {
        self.check_open()?;
        self.tool_responses.lock().push(responses);
        Ok(())
    }
}

/// Replies in order; an exhausted script yields empty text.
#[derive(Default)]
pub struct FakeGenerator {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        self.prompts.lock().push(request.prompt);
        Ok(self.replies.lock().pop_front().unwrap_or_default())
    }
}
