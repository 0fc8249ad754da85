//! Query reformulation between confidence-gate iterations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::generator::{generate_with_timeout, recent, ChatMessage, Generator};
use crate::prompt::{reformulation_prompt, strip_quotes, REWRITE_SYSTEM_PROMPT};

/// Produces the next query to try after an insufficient iteration. Infallible:
/// implementations that call out to a model fall back to a deterministic rewrite.
#[async_trait]
pub trait Reformulator: Send + Sync {
    async fn reformulate(&self, query: &str, history: &[ChatMessage]) -> String;
}

/// Appends a fixed suffix.
#[derive(Debug, Clone)]
pub struct SuffixReformulator {
    suffix: String,
}

impl SuffixReformulator {
    pub fn new(suffix: impl Into<String>) -> Self { Self { suffix: suffix.into() } }

    pub fn apply(&self, query: &str) -> String { format!("{}{}", query, self.suffix) }
}

#[async_trait]
impl Reformulator for SuffixReformulator {
    async fn reformulate(&self, query: &str, _history: &[ChatMessage]) -> String { self.apply(query) }
}

/// Asks the generator for a standalone rewrite using recent turns.
pub struct ConversationalReformulator {
    generator: Arc<dyn Generator>,
    timeout: Duration,
    history_turns: usize,
    fallback: SuffixReformulator,
}

impl ConversationalReformulator {
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration, history_turns: usize, fallback: SuffixReformulator) -> Self {
        Self { generator, timeout, history_turns, fallback }
    }
}

#[async_trait]
impl Reformulator for ConversationalReformulator {
    async fn reformulate(&self, query: &str, history: &[ChatMessage]) -> String {
        let prompt = reformulation_prompt(recent(history, self.history_turns), query);
        let messages = [ChatMessage::user(prompt)];
        match generate_with_timeout(self.generator.as_ref(), self.timeout, REWRITE_SYSTEM_PROMPT, &messages).await {
            Ok(text) => {
                let rewritten = strip_quotes(&text);
                if rewritten.is_empty() || rewritten == query {
                    debug!("rewrite added nothing; using suffix");
                    return self.fallback.apply(query);
                }
                rewritten
            }
            Err(e) => {
                warn!(error = %e, "reformulation failed; using suffix");
                self.fallback.apply(query)
            }
        }
    }
}
