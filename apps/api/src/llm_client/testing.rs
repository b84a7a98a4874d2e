//! Scripted `CompletionBackend` for tests. Never talks to the network.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm_client::{CompletionBackend, LlmError};

type Responder = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

pub struct ScriptedBackend {
    responder: Responder,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedBackend {
    /// Answers each prompt with whatever `responder` returns for it.
    pub fn new(responder: impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn failing(error: LlmError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Every (system, prompt) pair received, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        (self.responder)(prompt)
    }
}
