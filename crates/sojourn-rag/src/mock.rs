//! In-memory test doubles for the index and completion seams.
//!
//! Exported so that downstream crates can drive whole conversations
//! without network access.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use sojourn_core::types::{ChatMessage, Passage};

use crate::completion::CompletionClient;
use crate::error::RagError;
use crate::index::PassageIndex;

// =============================================================================
// Indexes
// =============================================================================

/// Returns the same passages for every query and records the queries.
#[derive(Default)]
pub struct StaticIndex {
    passages: Vec<Passage>,
    queries: Mutex<Vec<String>>,
}

impl StaticIndex {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Query texts received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PassageIndex for StaticIndex {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<Passage>, RagError> {
        if let Ok(mut q) = self.queries.lock() {
            q.push(text.to_string());
        }
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }
}

/// Always fails with a transport error.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingIndex;

#[async_trait]
impl PassageIndex for FailingIndex {
    async fn query(&self, _text: &str, _top_k: usize) -> Result<Vec<Passage>, RagError> {
        Err(RagError::Transport("index unavailable".to_string()))
    }
}

// =============================================================================
// Completion
// =============================================================================

/// One recorded completion request.
#[derive(Debug, Clone)]
pub struct CompletionCall {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

impl CompletionCall {
    /// Content of the system message, if any.
    pub fn system(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == sojourn_core::types::Role::System)
            .map(|m| m.content.as_str())
    }

    /// Content of the last user message, if any.
    pub fn user(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == sojourn_core::types::Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Replays queued replies in order, then a default reply.
///
/// A queued `Err` simulates a transport failure for that call.
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, String>>>,
    default_reply: String,
    calls: Mutex<Vec<CompletionCall>>,
}

impl Default for ScriptedCompletion {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: "General guidance.".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply used once the queue is empty.
    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Ok(text.into()));
        }
        self
    }

    /// Queue a transport failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(message.into()));
        }
        self
    }

    /// Queue a successful reply on a shared instance.
    pub fn push_reply(&self, text: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Ok(text.into()));
        }
    }

    /// Queue a transport failure on a shared instance.
    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(message.into()));
        }
    }

    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, RagError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(CompletionCall {
                messages: messages.to_vec(),
                temperature,
            });
        }

        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(Ok(text)) => Ok(text.trim().to_string()),
            Some(Err(msg)) => Err(RagError::Transport(msg)),
            None => Ok(self.default_reply.clone()),
        }
    }
}
