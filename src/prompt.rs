//! Few-shot chat prompt assembly.

use crate::error::{Result, TldwError};
use crate::fewshot::FormattedExample;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use serde::Serialize;

/// Speaker of a prompt turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Human,
    Ai,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::Human => write!(f, "human"),
            Role::Ai => write!(f, "ai"),
        }
    }
}

/// One role-tagged turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// An ordered chat prompt. Turn order is part of the prompt's meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    messages: Vec<Message>,
}

impl Prompt {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of few-shot (human, ai) pairs.
    pub fn example_count(&self) -> usize {
        self.messages.len().saturating_sub(2) / 2
    }

    /// Convert to OpenAI chat messages, order unchanged.
    pub fn to_openai_messages(&self) -> Result<Vec<ChatCompletionRequestMessage>> {
        self.messages
            .iter()
            .map(|m| {
                let message: ChatCompletionRequestMessage = match m.role {
                    Role::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(|e| TldwError::Upstream(e.to_string()))?
                        .into(),
                    Role::Human => ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(|e| TldwError::Upstream(e.to_string()))?
                        .into(),
                    Role::Ai => ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(|e| TldwError::Upstream(e.to_string()))?
                        .into(),
                };
                Ok(message)
            })
            .collect()
    }

    /// Plain-text rendering for `--show-prompt`.
    pub fn to_transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("--- {} ---\n{}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Build the few-shot prompt.
///
/// System turn first, then one (human = metadata, ai = summary) pair per
/// retrieved example in retrieval order, then the query as the final human turn.
pub fn assemble(system_instructions: &str, retrieved: &[FormattedExample], query_text: &str) -> Prompt {
    let mut messages = Vec::with_capacity(retrieved.len() * 2 + 2);
    messages.push(Message::new(Role::System, system_instructions));
    for example in retrieved {
        messages.push(Message::new(Role::Human, example.metadata_text.clone()));
        messages.push(Message::new(Role::Ai, example.summary_text.clone()));
    }
    messages.push(Message::new(Role::Human, query_text));
    Prompt { messages }
}
