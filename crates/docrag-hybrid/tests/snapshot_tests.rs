use std::fs;
use std::sync::Arc;

use docrag_core::types::{ChunkMetadata, DocumentChunk, FusionPolicy};
use docrag_core::Error;
use docrag_embed::HashingEmbedder;
use docrag_hybrid::fusion::FusionWeights;
use docrag_hybrid::{HybridRetriever, IndexGeneration, IndexStore, RetrieverConfig, SnapshotStore};
use tempfile::TempDir;

fn corpus() -> Vec<DocumentChunk> {
    let texts = [
        "The employer must give written notice before termination of the contract.",
        "A notice period of thirty days applies to either party.",
        "Citizenship may be acquired by birth, descent or registration.",
        "Parliament consists of the President and two houses.",
        "The judiciary is independent and subject only to the constitution.",
    ];
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| {
            DocumentChunk::new(
                format!("doc{i}:0"),
                *t,
                ChunkMetadata {
                    doc_id: format!("doc{i}"),
                    filename: format!("doc{i}.pdf"),
                    page_number: 1,
                    chunk_index: 0,
                    total_chunks: 1,
                },
            )
        })
        .collect()
}

fn weighted_retriever(embedder: Arc<HashingEmbedder>) -> HybridRetriever {
    HybridRetriever::new(
        embedder,
        RetrieverConfig { policy: FusionPolicy::Weighted, k_lexical: 5, k_dense: 5, k_fused: 5, weights: FusionWeights::default() },
    )
}

#[test]
fn round_trip_preserves_order_count_and_scores() {
    let tmp = TempDir::new().expect("tempdir");
    let embedder = Arc::new(HashingEmbedder::new(64));
    let original = IndexGeneration::build(7, corpus(), embedder.as_ref()).expect("build");

    let snapshots = SnapshotStore::new(tmp.path());
    let manifest = snapshots.save("legal", &original).expect("save");
    assert_eq!(manifest.chunk_count, 5);
    assert_eq!(manifest.dim, Some(64));
    assert!(snapshots.exists("legal"));

    let loaded = snapshots.load("legal").expect("load");
    assert_eq!(loaded.id(), 7);
    assert_eq!(loaded.chunks(), original.chunks());
    for (x, y) in loaded.vectors().iter().flatten().zip(original.vectors().iter().flatten()) {
        assert!((x - y).abs() < 1e-6);
    }

    let retriever = weighted_retriever(embedder);
    let query = "notice period for contract termination";
    let a = retriever.retrieve(&original, query).expect("retrieve original");
    let b = retriever.retrieve(&loaded, query).expect("retrieve loaded");
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.chunk.id, y.chunk.id);
        assert!((x.fused_score.unwrap() - y.fused_score.unwrap()).abs() < 1e-6);
    }
    let lexical_a = original.lexical().score(&["notice".into()]).unwrap();
    let lexical_b = loaded.lexical().score(&["notice".into()]).unwrap();
    for (x, y) in lexical_a.iter().zip(&lexical_b) { assert!((x - y).abs() < 1e-6); }
}

#[test]
fn missing_snapshot_loads_softly() {
    let tmp = TempDir::new().expect("tempdir");
    let snapshots = SnapshotStore::new(tmp.path());
    assert!(matches!(snapshots.load("nope"), Err(Error::NotFound(_))));

    let store = IndexStore::new(Arc::new(HashingEmbedder::new(64)));
    assert!(!store.load(&snapshots, "nope").expect("soft failure"));
    assert!(store.current().is_empty());
}

#[test]
fn corrupted_payload_is_malformed() {
    let tmp = TempDir::new().expect("tempdir");
    let embedder = HashingEmbedder::new(64);
    let snapshots = SnapshotStore::new(tmp.path());
    snapshots.save("legal", &IndexGeneration::build(1, corpus(), &embedder).unwrap()).unwrap();

    let payload = tmp.path().join("legal").join("payload.json");
    let bytes = fs::read(&payload).unwrap();
    fs::write(&payload, &bytes[..bytes.len() / 2]).unwrap();

    assert!(matches!(snapshots.load("legal"), Err(Error::MalformedSnapshot(_))));
    let store = IndexStore::new(Arc::new(HashingEmbedder::new(64)));
    assert!(!store.load(&snapshots, "legal").expect("soft failure"));
}

#[test]
fn garbled_manifest_and_foreign_version_are_malformed() {
    let tmp = TempDir::new().expect("tempdir");
    let embedder = HashingEmbedder::new(64);
    let snapshots = SnapshotStore::new(tmp.path());
    snapshots.save("legal", &IndexGeneration::build(1, corpus(), &embedder).unwrap()).unwrap();
    let manifest_path = tmp.path().join("legal").join("manifest.json");

    let manifest = fs::read_to_string(&manifest_path).unwrap();
    fs::write(&manifest_path, manifest.replace("\"format_version\": 1", "\"format_version\": 99")).unwrap();
    assert!(matches!(snapshots.load("legal"), Err(Error::MalformedSnapshot(_))));

    fs::write(&manifest_path, "{ not json").unwrap();
    assert!(matches!(snapshots.load("legal"), Err(Error::MalformedSnapshot(_))));
}

#[test]
fn huge_manifest_generation_does_not_overflow_ids() {
    let tmp = TempDir::new().expect("tempdir");
    let snapshots = SnapshotStore::new(tmp.path());
    let embedder = Arc::new(HashingEmbedder::new(64));
    snapshots.save("legal", &IndexGeneration::build(1, corpus(), embedder.as_ref()).unwrap()).unwrap();
    let manifest_path = tmp.path().join("legal").join("manifest.json");
    let manifest = fs::read_to_string(&manifest_path).unwrap();
    assert!(manifest.contains("\"generation\": 1,"));
    fs::write(&manifest_path, manifest.replace("\"generation\": 1,", &format!("\"generation\": {},", u64::MAX))).unwrap();

    let store = IndexStore::new(embedder);
    assert!(store.load(&snapshots, "legal").unwrap());
    assert_eq!(store.current().id(), u64::MAX);

    let rebuilt = store.replace_all(corpus()).unwrap();
    assert_eq!(rebuilt.id(), u64::MAX);
    assert_eq!(rebuilt.len(), 5);
}

#[test]
fn snapshot_from_another_embedding_width_is_rejected() {
    let tmp = TempDir::new().expect("tempdir");
    let snapshots = SnapshotStore::new(tmp.path());
    let narrow = HashingEmbedder::new(32);
    snapshots.save("legal", &IndexGeneration::build(1, corpus(), &narrow).unwrap()).unwrap();

    let store = IndexStore::new(Arc::new(HashingEmbedder::new(64)));
    let err = store.load(&snapshots, "legal").unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 64, actual: 32 }));
    assert!(store.current().is_empty());
}

#[test]
fn store_round_trip_installs_generation() {
    let tmp = TempDir::new().expect("tempdir");
    let snapshots = SnapshotStore::new(tmp.path());
    let embedder = Arc::new(HashingEmbedder::new(64));

    let store = IndexStore::new(embedder.clone());
    store.add_documents(corpus()).expect("ingest");
    store.save(&snapshots, "legal").expect("save");

    let fresh = IndexStore::new(embedder);
    assert!(fresh.load(&snapshots, "legal").expect("load"));
    assert_eq!(fresh.current().len(), 5);
    assert_eq!(fresh.current().documents().len(), 5);

    // new generations continue numbering after the loaded one
    let loaded_id = fresh.current().id();
    fresh.add_documents(Vec::new()).expect("rebuild");
    assert!(fresh.current().id() > loaded_id);
}

#[test]
fn snapshot_names_cannot_escape_the_root() {
    let tmp = TempDir::new().expect("tempdir");
    let snapshots = SnapshotStore::new(tmp.path());
    for name in ["", "..", "a/b", "a\\b"] {
        assert!(matches!(snapshots.dir(name), Err(Error::InvalidInput(_))), "accepted {name:?}");
    }
}
