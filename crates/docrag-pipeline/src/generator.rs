//! Generation provider seam.
//!
//! The pipeline only needs `generate(system_prompt, messages) -> text`. Every
//! call goes through [`generate_with_timeout`] so a stalled provider surfaces
//! as `GenerationTimeout` instead of hanging the query.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use docrag_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self { Self { role: Role::User, content: content.into() } }

    pub fn assistant(content: impl Into<String>) -> Self { Self { role: Role::Assistant, content: content.into() } }
}

/// Text generation capability. Provider failures are returned as
/// `Error::GenerationProvider`; the pipeline surfaces them unchanged.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_id(&self) -> &str;

    async fn generate(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<String>;
}

pub async fn generate_with_timeout(
    generator: &dyn Generator,
    timeout: Duration,
    system_prompt: &str,
    messages: &[ChatMessage],
) -> Result<String> {
    match tokio::time::timeout(timeout, generator.generate(system_prompt, messages)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(model = generator.model_id(), ?timeout, "generation timed out");
            Err(Error::GenerationTimeout(timeout))
        }
    }
}

/// Render turns as `ROLE: content` lines for prompts that embed a transcript.
pub fn transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The last `n` turns of `history`.
pub fn recent(history: &[ChatMessage], n: usize) -> &[ChatMessage] {
    &history[history.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_uppercases_roles() {
        let turns = [ChatMessage::user("what is a notice period?"), ChatMessage::assistant("thirty days")];
        assert_eq!(transcript(&turns), "USER: what is a notice period?\nASSISTANT: thirty days");
    }

    #[test]
    fn recent_keeps_the_tail() {
        let turns: Vec<_> = (0..6).map(|i| ChatMessage::user(i.to_string())).collect();
        let tail: Vec<&str> = recent(&turns, 4).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(tail, vec!["2", "3", "4", "5"]);
        assert_eq!(recent(&turns[..2], 4).len(), 2);
    }
}
