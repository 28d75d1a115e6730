use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chat message sent to a pipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Body of `POST /v1/pipes/run`
#[derive(Debug, Clone, Serialize)]
pub struct PipeRequest {
    pub name: String,
    pub messages: Vec<Message>,
    /// Always false; callers need the whole completion
    pub stream: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, String>,
}

impl PipeRequest {
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            stream: false,
            variables: HashMap::new(),
        }
    }

    /// System prompt followed by the user's turns, oldest first.
    pub fn with_transcript(
        name: impl Into<String>,
        system_prompt: &str,
        user_turns: &[String],
    ) -> Self {
        let messages = std::iter::once(Message::system(system_prompt))
            .chain(user_turns.iter().map(Message::user))
            .collect();
        Self::new(name, messages)
    }

    /// Fill a `{{key}}` variable in the pipe's prompt.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// Pipe run result. Only the fields this crate reads are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct PipeResponse {
    pub success: bool,
    #[serde(default)]
    pub completion: String,
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub raw: Option<RawResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub total_tokens: Option<u32>,
}

impl PipeResponse {
    /// Total tokens reported by the model, if any.
    pub fn total_tokens(&self) -> Option<u32> {
        self.raw.as_ref()?.usage.as_ref()?.total_tokens
    }
}
