//! Page-aware character chunking for `.txt` sources.
//!
//! Form feeds (`\x0c`) separate pages, the same convention `pdftotext` uses.
//! Windows of `chunk_size` characters step by `chunk_size - chunk_overlap`;
//! `chunk_index` runs densely across the whole document, not per page.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::RagSettings;
use crate::types::{ChunkMetadata, DocumentChunk};
use crate::{Error, Result};

const PAGE_BREAK: char = '\x0c';

/// One page of extracted text, 1-based.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 || config.chunk_overlap >= config.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than a positive chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn from_settings(settings: &RagSettings) -> Result<Self> {
        Self::new(ChunkingConfig { chunk_size: settings.chunk_size, chunk_overlap: settings.chunk_overlap })
    }

    /// Split one document's pages into chunks carrying full metadata.
    /// Blank pages produce no chunks.
    pub fn chunk_pages(&self, filename: &str, pages: &[Page]) -> Vec<DocumentChunk> {
        let doc_id = doc_id_for(filename);
        let mut windows: Vec<(u32, String)> = Vec::new();
        for page in pages {
            let text = page.text.trim();
            if text.is_empty() { continue; }
            for window in self.split(text) { windows.push((page.number, window)); }
        }
        let total_chunks = windows.len();
        windows
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (page_number, text))| DocumentChunk {
                id: format!("{}:{}", doc_id, chunk_index),
                text,
                metadata: ChunkMetadata {
                    doc_id: doc_id.clone(),
                    filename: filename.to_string(),
                    page_number,
                    chunk_index,
                    total_chunks,
                },
            })
            .collect()
    }

    fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.config.chunk_size { return vec![text.to_string()]; }
        let step = self.config.chunk_size - self.config.chunk_overlap;
        let mut out = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.config.chunk_size).min(chars.len());
            out.push(chars[start..end].iter().collect());
            start += step;
        }
        out
    }

    /// Read a `.txt` file and chunk it, using its file name as the document name.
    pub fn chunk_file(&self, file_path: &Path) -> Result<Vec<DocumentChunk>> {
        let content = match fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(file_path)?).to_string(),
        };
        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::InvalidInput(format!("not a file: {}", file_path.display())))?;
        let chunks = self.chunk_pages(&filename, &split_pages(&content));
        debug!(file = %file_path.display(), chunks = chunks.len(), "chunked file");
        Ok(chunks)
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<DocumentChunk>> {
        let files = list_txt_files(data_dir);
        if files.is_empty() {
            info!("No .txt files found under {}", data_dir.display());
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for file_path in &files {
            all_chunks.extend(self.chunk_file(file_path)?);
        }
        info!("Processed {} files into {} chunks", files.len(), all_chunks.len());
        Ok(all_chunks)
    }
}

/// Split raw text into numbered pages on form feeds.
pub fn split_pages(content: &str) -> Vec<Page> {
    content
        .split(PAGE_BREAK)
        .zip(1u32..)
        .map(|(text, number)| Page { number, text: text.to_string() })
        .collect()
}

/// Stable 12-hex-character document id derived from the file name.
pub fn doc_id_for(filename: &str) -> String {
    let hash = blake3::hash(filename.as_bytes()).to_hex();
    hash.as_str()[..12].to_string()
}

pub fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
    }
    txt_files.sort();
    txt_files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig { chunk_size: size, chunk_overlap: overlap }).expect("valid config")
    }

    #[test]
    fn short_page_is_single_chunk() {
        let chunks = chunker(100, 10).chunk_pages("a.txt", &[Page { number: 1, text: "hello".into() }]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello");
        assert_eq!(chunks[0].metadata.total_chunks, 1);
    }

    #[test]
    fn windows_overlap_and_indices_are_dense_across_pages() {
        let pages = vec![
            Page { number: 1, text: "abcdefghij".into() },
            Page { number: 2, text: "   ".into() },
            Page { number: 3, text: "klmnopqrst".into() },
        ];
        let chunks = chunker(4, 1).chunk_pages("doc.txt", &pages);
        // 10 chars, step 3 -> starts 0,3,6,9 -> four windows per page
        assert_eq!(chunks.len(), 8);
        assert_eq!(chunks[0].text, "abcd");
        assert_eq!(chunks[1].text, "defg");
        assert_eq!(chunks[3].text, "j");
        assert_eq!(chunks[4].metadata.page_number, 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.metadata.chunk_index, i);
            assert_eq!(c.metadata.total_chunks, 8);
            assert_eq!(c.id, format!("{}:{}", c.metadata.doc_id, i));
        }
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(Chunker::new(ChunkingConfig { chunk_size: 10, chunk_overlap: 10 }).is_err());
        assert!(Chunker::new(ChunkingConfig { chunk_size: 0, chunk_overlap: 0 }).is_err());
    }

    #[test]
    fn doc_id_is_stable_and_short() {
        let a = doc_id_for("contract.pdf");
        assert_eq!(a.len(), 12);
        assert_eq!(a, doc_id_for("contract.pdf"));
        assert_ne!(a, doc_id_for("other.pdf"));
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let chunks = chunker(3, 1).chunk_pages("u.txt", &[Page { number: 1, text: "äöüßéè".into() }]);
        assert_eq!(chunks[0].text, "äöü");
        assert_eq!(chunks[1].text, "üßé");
    }
}
