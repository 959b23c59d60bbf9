use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bendline_core::{VisionProvider, VisionRequest, VisionResponse};

/// A scripted provider: replays queued replies in order, then repeats the
/// fallback. Every request is recorded for inspection.
pub struct MockVisionProvider {
    name: String,
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<VisionRequest>>,
}

impl MockVisionProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply used once the script is exhausted.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(response.into());
        self
    }

    pub fn then_reply(self, response: impl Into<String>) -> Self {
        self.push(Ok(response.into()))
    }

    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()))
    }

    fn push(self, step: Result<String, String>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(step);
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn last_request(&self) -> Option<VisionRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &VisionRequest) -> Result<VisionResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let step = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let content = match step {
            Some(Ok(text)) => text,
            Some(Err(message)) => return Err(anyhow!(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| anyhow!("mock provider '{}' has no reply", self.name))?,
        };
        Ok(VisionResponse {
            content,
            provider: self.name.clone(),
            model: request.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}
