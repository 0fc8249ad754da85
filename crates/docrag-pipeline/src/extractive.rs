//! Offline generator that answers by quoting the best-matching source sentences.
//!
//! It understands the grounded prompt layout (`[Source i - Page p]:` blocks
//! followed by a `Question:` line). Anything else, such as a rewrite request,
//! is reported as a provider error so callers take their fallback path.

use std::collections::HashSet;

use async_trait::async_trait;

use docrag_core::{Error, Result};

use crate::generator::{ChatMessage, Generator, Role};

const MODEL_ID: &str = "extractive";
const MAX_SENTENCES: usize = 2;
const REFUSAL: &str = "I cannot answer this question as it is not covered in the available documents.";
const STOP_WORDS: [&str; 24] = [
    "the", "a", "an", "of", "to", "in", "on", "for", "and", "or", "is", "are", "was", "be", "by", "with", "what",
    "which", "who", "how", "does", "do", "can", "under",
];

#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator {
    max_sentences: Option<usize>,
}

impl ExtractiveGenerator {
    pub fn new() -> Self { Self::default() }

    pub fn with_max_sentences(max: usize) -> Self { Self { max_sentences: Some(max.max(1)) } }
}

struct SourceBlock {
    number: usize,
    text: String,
}

fn content_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn parse_header(line: &str) -> Option<usize> {
    let rest = line.strip_prefix("[Source ")?;
    let (number, _) = rest.split_once(" - Page ")?;
    if !line.ends_with("]:") {
        return None;
    }
    number.trim().parse().ok()
}

/// Source blocks and the question from a grounded user prompt.
fn parse_prompt(prompt: &str) -> (Vec<SourceBlock>, Option<String>) {
    let mut blocks: Vec<SourceBlock> = Vec::new();
    let mut question = None;
    let mut in_block = false;
    for line in prompt.lines() {
        if let Some(number) = parse_header(line.trim()) {
            blocks.push(SourceBlock { number, text: String::new() });
            in_block = true;
        } else if let Some(q) = line.strip_prefix("Question:") {
            question = Some(q.trim().to_string());
            in_block = false;
        } else if in_block && !line.trim().is_empty() {
            if let Some(block) = blocks.last_mut() {
                if !block.text.is_empty() {
                    block.text.push(' ');
                }
                block.text.push_str(line.trim());
            }
        }
    }
    (blocks, question)
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '?', '!', ';']).map(str::trim).filter(|s| !s.is_empty())
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn model_id(&self) -> &str { MODEL_ID }

    async fn generate(&self, _system_prompt: &str, messages: &[ChatMessage]) -> Result<String> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .ok_or_else(|| Error::GenerationProvider("no user message to answer".into()))?;
        let (blocks, question) = parse_prompt(&prompt.content);
        let question = match question {
            Some(q) if !blocks.is_empty() => q,
            _ => return Err(Error::GenerationProvider("extractive generator needs source blocks and a question".into())),
        };
        let wanted = content_words(&question);

        // (overlap, block order, sentence order) so ties resolve by position
        let mut scored: Vec<(usize, usize, usize, String)> = Vec::new();
        for (b, block) in blocks.iter().enumerate() {
            for (s, sentence) in sentences(&block.text).enumerate() {
                let overlap = content_words(sentence).intersection(&wanted).count();
                if overlap > 0 {
                    scored.push((overlap, b, s, format!("{} [Source {}]", sentence, block.number)));
                }
            }
        }
        if scored.is_empty() {
            return Ok(REFUSAL.to_string());
        }
        scored.sort_by(|x, y| y.0.cmp(&x.0).then(x.1.cmp(&y.1)).then(x.2.cmp(&y.2)));
        let picked: Vec<String> =
            scored.into_iter().take(self.max_sentences.unwrap_or(MAX_SENTENCES)).map(|(.., s)| s).collect();
        Ok(picked.join(" "))
    }
}
