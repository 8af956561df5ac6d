//! The completion-service boundary and a deterministic scripted backend.

use crate::LlmError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One blocking request/response exchange with a language model.
///
/// Implementations own model selection, authentication and transport
/// timeouts; callers see only text in and text out.
pub trait CompletionService: Send + Sync {
    fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String, LlmError>;

    /// Short backend label for logs and status lines.
    fn describe(&self) -> String {
        "completion".to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Replays queued responses in order and records every prompt it receives.
#[derive(Debug)]
pub struct ScriptedCompletion {
    responses: Vec<String>,
    cycle: bool,
    next: AtomicUsize,
    prompts: Mutex<Vec<RecordedPrompt>>,
}

impl ScriptedCompletion {
    /// Each response is served once; a call past the end is an error.
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            cycle: false,
            next: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Serve the same response for every call.
    pub fn always(response: impl Into<String>) -> Self {
        Self {
            cycle: true,
            ..Self::new([response.into()])
        }
    }

    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

impl CompletionService for ScriptedCompletion {
    fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String, LlmError> {
        self.prompts.lock().push(RecordedPrompt {
            system: system.to_string(),
            user: user.to_string(),
            temperature,
        });
        let idx = self.next.fetch_add(1, Ordering::SeqCst);
        let picked = if self.cycle && !self.responses.is_empty() {
            self.responses.get(idx % self.responses.len())
        } else {
            self.responses.get(idx)
        };
        picked.cloned().ok_or_else(|| LlmError::InvalidResponse {
            backend: "scripted",
            message: format!("no scripted response left for call #{}", idx + 1),
        })
    }

    fn describe(&self) -> String {
        format!("scripted ({} response(s))", self.responses.len())
    }
}
