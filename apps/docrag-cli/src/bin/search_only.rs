//! Retrieval and reranking only: shows what the confidence gate would see.
use std::env;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use docrag_core::config::Config;
use docrag_hybrid::{HybridRetriever, IndexStore, RetrieverConfig, SnapshotStore};
use docrag_pipeline::Reranker;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [snapshot_name]", args[0]);
        eprintln!("Example: {} 'contract termination notice period' default", args[0]);
        std::process::exit(1);
    }
    let query = &args[1];
    let settings = Config::load().context("loading configuration")?.settings()?;
    let name = args.get(2).cloned().unwrap_or_else(|| settings.index_name.clone());

    let embedder = docrag_embed::get_default_embedder(&settings)?;
    let store = IndexStore::new(embedder.clone());
    let snapshots = SnapshotStore::new(settings.index_path(&env::current_dir()?));
    if !store.load(&snapshots, &name)? {
        eprintln!("No usable snapshot '{}' under {}; run `docrag ingest` first", name, snapshots.root().display());
        std::process::exit(1);
    }
    let generation = store.current();

    println!("🔍 docrag-search\n===============");
    println!("Query: {}", query);
    println!("Snapshot: {} (generation {}, {} chunks)", name, generation.id(), generation.len());

    let retriever = HybridRetriever::new(embedder, RetrieverConfig::from_settings(&settings));
    let candidates = retriever.retrieve(&generation, query)?;
    println!("\n🧲 {} candidates ({:?} fusion)", candidates.len(), settings.fusion);
    for (i, c) in candidates.iter().enumerate() {
        let fused = c.fused_score.map(|s| format!("{:.4}", s)).unwrap_or_else(|| "-".into());
        println!("  {}. fused={}  via={:?}  id={}", i + 1, fused, c.matched_by, c.chunk.id);
    }

    let reranker = Reranker::new(docrag_embed::get_default_cross_encoder(&settings)?);
    let chunks = candidates.into_iter().map(|c| c.chunk).collect();
    let reranked = reranker.rerank(query, chunks, Some(settings.top_k_reranked))?;
    println!("\n🏅 Reranked by {} (threshold {:.2})", reranker.model_id(), settings.confidence_threshold);
    for (i, r) in reranked.iter().enumerate() {
        let mark = if r.score >= settings.confidence_threshold { "✓" } else { " " };
        let snippet: String = r.chunk.text.chars().take(120).collect();
        println!("  {} {}. score={:.4}  {} p.{}", mark, i + 1, r.score, r.chunk.metadata.filename, r.chunk.metadata.page_number);
        println!("       {}", snippet.replace('\n', " "));
    }
    Ok(())
}
