use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{ChatClient, ChatRequest};

/// Canned chat backend for tests; records every request it sees.
pub struct StubChatClient {
    reply: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl StubChatClient {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as if the upstream were unreachable.
    pub fn failing() -> Self {
        Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for StubChatClient {
    async fn complete(&self, request: ChatRequest) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => anyhow::bail!("upstream unavailable"),
        }
    }
}
