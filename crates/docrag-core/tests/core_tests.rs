use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

use docrag_core::chunking::{Chunker, ChunkingConfig};
use docrag_core::config::{resolve_with_base, Config};
use docrag_core::types::{FusionPolicy, PipelineVariant};

#[test]
fn process_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Short text").unwrap();

    let chunks = Chunker::default().process_directory(dir).expect("process");

    assert_eq!(chunks.len(), 1, "one small page becomes one chunk");
    assert_eq!(chunks[0].text, "Short text");
    assert_eq!(chunks[0].metadata.filename, "a.txt");
    assert_eq!(chunks[0].metadata.page_number, 1);
}

#[test]
fn form_feed_separates_pages() {
    let tmp = TempDir::new().unwrap();
    let file_path = tmp.path().join("act.txt");
    fs::write(&file_path, "first page\x0csecond page\x0c\x0cfourth page").unwrap();

    let chunker = Chunker::new(ChunkingConfig { chunk_size: 50, chunk_overlap: 5 }).unwrap();
    let chunks = chunker.chunk_file(&file_path).expect("chunk");

    let pages: Vec<u32> = chunks.iter().map(|c| c.metadata.page_number).collect();
    assert_eq!(pages, vec![1, 2, 4], "blank third page yields nothing");
}

#[test]
fn non_txt_files_are_ignored() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.txt"), "alpha bravo").unwrap();
    fs::write(tmp.path().join("b.md"), "charlie delta").unwrap();

    let chunks = Chunker::default().process_directory(tmp.path()).expect("process");
    assert_eq!(chunks.len(), 1);
}

#[test]
fn defaults_match_documented_values() {
    let settings = Config::from_toml_str("").unwrap().settings().unwrap();
    assert_eq!(settings.top_k_lexical, 5);
    assert_eq!(settings.top_k_dense, 5);
    assert_eq!(settings.top_k_reranked, 3);
    assert_eq!(settings.max_retrieval_loops, 2);
    assert!((settings.confidence_threshold - 0.5).abs() < f64::EPSILON);
    assert_eq!(settings.fusion, FusionPolicy::SetUnion);
    assert_eq!(settings.variant, PipelineVariant::Classic);
}

#[test]
fn toml_overrides_and_expansion_table() {
    let toml = r#"
        [rag]
        fusion = "weighted"
        variant = "conversational"
        confidence_threshold = 0.3
        top_k_dense = 8

        [rag.expansion.terms]
        constitution = ["supreme law", "fundamental law", "charter"]
    "#;
    let settings = Config::from_toml_str(toml).unwrap().settings().unwrap();
    assert_eq!(settings.fusion, FusionPolicy::Weighted);
    assert_eq!(settings.variant, PipelineVariant::Conversational);
    assert_eq!(settings.top_k_dense, 8);
    assert_eq!(settings.top_k_lexical, 5, "untouched keys keep defaults");
    assert_eq!(settings.expansion.terms["constitution"].len(), 3);
}

#[test]
fn invalid_settings_are_rejected() {
    for toml in [
        "[rag]\nchunk_size = 100\nchunk_overlap = 100",
        "[rag]\nconfidence_threshold = 1.5",
        "[rag]\nmax_retrieval_loops = 0",
        "[rag]\ntop_k_reranked = 0",
        "[rag]\ndense_weight = -0.1",
        "[rag]\nrerank = false\nfusion = \"set_union\"",
        "[rag]\nrerank = false\nfusion = \"weighted\"\ndense_weight = 1.0\nlexical_weight = 1.0",
        "[rag]\ndense_weight = 0.7\nlexical_weight = 0.4",
    ] {
        assert!(Config::from_toml_str(toml).is_err(), "accepted: {toml}");
    }
}

#[test]
fn weighted_fusion_may_skip_reranking() {
    let config = Config::from_toml_str("[rag]\nrerank = false\nfusion = \"weighted\"").expect("valid");
    assert!(!config.settings().unwrap().rerank);
}

#[test]
fn fusion_weights_may_sum_below_one() {
    let config = Config::from_toml_str("[rag]\ndense_weight = 0.5\nlexical_weight = 0.3").expect("valid");
    let settings = config.settings().unwrap();
    assert_eq!((settings.dense_weight, settings.lexical_weight), (0.5, 0.3));

    let mut doubled = settings;
    doubled.dense_weight = 1.0;
    doubled.lexical_weight = 1.0;
    assert!(doubled.validate().is_err());
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = Path::new("/srv/docrag");
    assert_eq!(resolve_with_base(base, "indexes"), base.join("indexes"));
    assert_eq!(resolve_with_base(base, "/abs/path"), Path::new("/abs/path"));
}
