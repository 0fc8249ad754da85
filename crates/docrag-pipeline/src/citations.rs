//! Citation markers in generated answers.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use docrag_core::types::DocumentChunk;

static RE_CITATION: OnceLock<Regex> = OnceLock::new();
static RE_SOURCE: OnceLock<Regex> = OnceLock::new();

fn re_citation() -> &'static Regex {
    RE_CITATION.get_or_init(|| Regex::new(r"\[(?:Source|Page)\s+\d+\]").expect("valid citation regex"))
}

fn re_source() -> &'static Regex {
    RE_SOURCE.get_or_init(|| Regex::new(r"\[Source\s+(\d+)\]").expect("valid source regex"))
}

/// `[Source N]` and `[Page N]` markers, in order of appearance.
pub fn extract_citations(text: &str) -> Vec<String> {
    re_citation().find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Expand `[Source N]` into `[Source N: filename, Page P]` using the
/// 1-based context order. Markers that point past the list are left alone.
pub fn link_citations(answer: &str, chunks: &[&DocumentChunk]) -> String {
    re_source()
        .replace_all(answer, |caps: &Captures| {
            let linked = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| chunks.get(i))
                .map(|c| format!("[Source {}: {}, Page {}]", &caps[1], c.metadata.filename, c.metadata.page_number));
            linked.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// `[filename, Page P]`.
pub fn format_source_reference(chunk: &DocumentChunk) -> String {
    format!("[{}, Page {}]", chunk.metadata.filename, chunk.metadata.page_number)
}
