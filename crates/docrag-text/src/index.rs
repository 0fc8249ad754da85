use std::fmt;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use docrag_core::{Error, Result};

use crate::tantivy_utils::{build_schema, register_tokenizer, LexicalFields};

/// Lowercase + whitespace split. The same tokenization is applied to
/// documents at build time and to queries.
pub fn tokenize(text: &str) -> Vec<String> {
	text.split_whitespace().map(str::to_lowercase).collect()
}

fn tantivy_err(e: impl fmt::Display) -> Error { Error::Operation(format!("tantivy: {}", e)) }

struct Built {
	reader: IndexReader,
	fields: LexicalFields,
	doc_count: usize,
}

/// BM25 scorer over a fixed, ordered document set.
///
/// Built once; scores come back as one value per document in insertion
/// order. An unbuilt index refuses queries with `IndexNotBuilt`.
#[derive(Default)]
pub struct LexicalIndex {
	built: Option<Built>,
}

impl fmt::Debug for LexicalIndex {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LexicalIndex").field("built", &self.is_built()).field("len", &self.len()).finish()
	}
}

impl LexicalIndex {
	pub fn new() -> Self { Self::default() }

	/// Build from already tokenized documents. Position `i` in `docs` is document `i`.
	pub fn build(docs: &[Vec<String>]) -> Result<Self> {
		let (schema, fields) = build_schema();
		let index = Index::create_in_ram(schema);
		register_tokenizer(&index);
		// One indexing thread keeps a single segment; ordinals are stored regardless.
		let mut writer: IndexWriter = index.writer_with_num_threads(1, 50_000_000).map_err(tantivy_err)?;
		for (ordinal, tokens) in docs.iter().enumerate() {
			writer
				.add_document(doc!(fields.content => tokens.join(" "), fields.ordinal => ordinal as u64))
				.map_err(tantivy_err)?;
		}
		writer.commit().map_err(tantivy_err)?;
		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(tantivy_err)?;
		debug!(documents = docs.len(), "lexical index built");
		Ok(Self { built: Some(Built { reader, fields, doc_count: docs.len() }) })
	}

	pub fn is_built(&self) -> bool { self.built.is_some() }

	pub fn len(&self) -> usize { self.built.as_ref().map_or(0, |b| b.doc_count) }

	pub fn is_empty(&self) -> bool { self.len() == 0 }

	/// One BM25 score per indexed document, in insertion order. Documents
	/// sharing no term with the query score 0.
	pub fn score(&self, query_tokens: &[String]) -> Result<Vec<f32>> {
		let built = self.built.as_ref().ok_or(Error::IndexNotBuilt("lexical index"))?;
		let mut scores = vec![0f32; built.doc_count];
		if built.doc_count == 0 || query_tokens.is_empty() { return Ok(scores); }

		let clauses: Vec<(Occur, Box<dyn Query>)> = query_tokens
			.iter()
			.map(|t| {
				let term = Term::from_field_text(built.fields.content, &t.to_lowercase());
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		let query = BooleanQuery::new(clauses);
		let searcher = built.reader.searcher();
		let top_docs = searcher.search(&query, &TopDocs::with_limit(built.doc_count)).map_err(tantivy_err)?;
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(tantivy_err)?;
			let ordinal = doc
				.get_first(built.fields.ordinal)
				.and_then(|v| v.as_u64())
				.ok_or_else(|| Error::Operation("lexical document without ordinal".into()))?;
			if let Some(slot) = usize::try_from(ordinal).ok().and_then(|i| scores.get_mut(i)) { *slot = score; }
		}
		Ok(scores)
	}

	/// Positions of the `k` best-scoring documents with a positive score.
	/// Equal scores keep insertion order. Documents sharing no term with the
	/// query are left out, so fewer than `k` positions may come back.
	pub fn top_k(&self, query_tokens: &[String], k: usize) -> Result<Vec<(usize, f32)>> {
		let scores = self.score(query_tokens)?;
		Ok(rank_positive(&scores, k))
	}
}

/// Stable descending ranking of positive scores, truncated to `k`.
pub(crate) fn rank_positive(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
	let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().filter(|(_, s)| *s > 0.0).collect();
	ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
	ranked.truncate(k);
	ranked
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rank_positive_is_stable_on_ties() {
		let ranked = rank_positive(&[1.0, 2.0, 0.0, 2.0, 1.0], 10);
		let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
		assert_eq!(order, vec![1, 3, 0, 4]);
	}

	#[test]
	fn tokenize_lowercases_and_splits() {
		assert_eq!(tokenize("  Notice\tPERIOD of\n30 days "), vec!["notice", "period", "of", "30", "days"]);
	}
}
