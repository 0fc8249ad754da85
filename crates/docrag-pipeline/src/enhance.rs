//! Rewrites vague follow-up questions into standalone search queries.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::generator::{generate_with_timeout, recent, ChatMessage, Generator, Role};
use crate::prompt::{standalone_question_prompt, strip_quotes, REWRITE_SYSTEM_PROMPT};

/// Referential words and phrases that mark a question as depending on earlier turns.
pub const VAGUE_INDICATORS: &[&str] = &[
    "it", "this", "that", "these", "those", "them", "the first", "the second", "the last", "the previous",
    "more", "details", "elaborate", "explain", "tell me more", "what about", "how about", "and", "also",
];

/// What the enhancement gate did with a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "query", rename_all = "snake_case")]
pub enum Enhancement {
    /// Not vague, or no history to resolve it against.
    Unchanged(String),
    Rewritten(String),
    /// The rewrite failed; the last user turn was prepended instead.
    Fallback(String),
}

impl Enhancement {
    pub fn query(&self) -> &str {
        match self {
            Enhancement::Unchanged(q) | Enhancement::Rewritten(q) | Enhancement::Fallback(q) => q,
        }
    }

    pub fn into_query(self) -> String {
        match self {
            Enhancement::Unchanged(q) | Enhancement::Rewritten(q) | Enhancement::Fallback(q) => q,
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether any indicator occurs in `question` as whole words.
pub fn has_vague_indicator(question: &str) -> bool {
    let words = words(question);
    VAGUE_INDICATORS.iter().any(|indicator| {
        let phrase: Vec<&str> = indicator.split_whitespace().collect();
        words.windows(phrase.len()).any(|w| w.iter().zip(&phrase).all(|(a, b)| a.as_str() == *b))
    })
}

pub struct QueryEnhancer {
    generator: Arc<dyn Generator>,
    timeout: Duration,
    history_turns: usize,
    word_limit: usize,
}

impl QueryEnhancer {
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration, history_turns: usize, word_limit: usize) -> Self {
        Self { generator, timeout, history_turns, word_limit }
    }

    /// Vague means: history exists, at most `word_limit` words, and a referential indicator.
    pub fn is_vague(&self, question: &str, history: &[ChatMessage]) -> bool {
        !history.is_empty() && question.split_whitespace().count() <= self.word_limit && has_vague_indicator(question)
    }

    /// Never fails: a failed rewrite degrades to the fallback query.
    pub async fn enhance(&self, question: &str, history: &[ChatMessage]) -> Enhancement {
        if !self.is_vague(question, history) {
            debug!(question, "query used as-is");
            return Enhancement::Unchanged(question.to_string());
        }
        let prompt = standalone_question_prompt(recent(history, self.history_turns), question);
        let messages = [ChatMessage::user(prompt)];
        match generate_with_timeout(self.generator.as_ref(), self.timeout, REWRITE_SYSTEM_PROMPT, &messages).await {
            Ok(text) => {
                let rewritten = strip_quotes(&text);
                if rewritten.is_empty() {
                    warn!("query rewrite came back empty");
                    return self.fallback(question, history);
                }
                info!(from = question, to = %rewritten, "query enhanced");
                Enhancement::Rewritten(rewritten)
            }
            Err(e) => {
                warn!(error = %e, "query rewrite failed");
                self.fallback(question, history)
            }
        }
    }

    fn fallback(&self, question: &str, history: &[ChatMessage]) -> Enhancement {
        match history.iter().rev().find(|m| m.role == Role::User) {
            Some(last) => Enhancement::Fallback(format!("{} {}", last.content, question)),
            None => Enhancement::Fallback(question.to_string()),
        }
    }
}
