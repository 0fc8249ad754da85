use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, STORED};
use tantivy::tokenizer::{LowerCaser, TextAnalyzer, WhitespaceTokenizer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "docrag_whitespace";

pub struct LexicalFields {
	pub content: Field,
	pub ordinal: Field,
}

/// `content` holds pre-tokenized text; `ordinal` is the chunk's position in the generation.
pub fn build_schema() -> (Schema, LexicalFields) {
	let mut schema_builder = Schema::builder();
	let indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqs);
	let content = schema_builder.add_text_field("content", TextOptions::default().set_indexing_options(indexing));
	let ordinal = schema_builder.add_u64_field("ordinal", STORED | FAST);
	(schema_builder.build(), LexicalFields { content, ordinal })
}

/// Whitespace split + lowercase, matching `index::tokenize` so query terms hit index terms exactly.
pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(WhitespaceTokenizer::default())
		.filter(LowerCaser)
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
