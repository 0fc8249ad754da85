use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use docrag_core::chunking::{list_txt_files, Chunker};
use docrag_core::config::Config;
use docrag_hybrid::SnapshotStore;
use docrag_pipeline::{ChatMessage, ExtractiveGenerator, QueryResponse, RagPipeline};

const USAGE: &str = "Usage: docrag <ingest [dir] [--rebuild] | query \"<question>\" [--history file.json] [--json] | docs [--json]>";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

struct Args {
    cmd: String,
    positional: Vec<String>,
    json: bool,
    rebuild: bool,
    history: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut raw = env::args().skip(1);
    let cmd = raw.next().ok_or_else(|| anyhow::anyhow!(USAGE))?;
    let mut args = Args { cmd, positional: Vec::new(), json: false, rebuild: false, history: None };
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--json" => args.json = true,
            "--rebuild" => args.rebuild = true,
            "--history" => args.history = Some(raw.next().map(PathBuf::from).context("--history requires a file")?),
            flag if flag.starts_with("--") => anyhow::bail!("unknown flag {flag}\n{USAGE}"),
            _ => args.positional.push(arg),
        }
    }
    Ok(args)
}

fn print_response(response: &QueryResponse) {
    println!("\n💬 {}", response.answer);
    println!("\n   outcome={:?}  iterations={}  context_based={}", response.outcome, response.iterations, response.is_context_based);
    if !response.quality_check.is_consistent {
        println!("   ⚠️  {}: {}", response.quality_check.reasoning, response.quality_check.issues.join("; "));
    }
    if !response.sources.is_empty() {
        println!("\n📚 Sources:");
        for (i, s) in response.sources.iter().enumerate() {
            let snippet: String = s.text.chars().take(160).collect();
            println!("  {}. score={:.3}  {} p.{}", i + 1, s.score, s.metadata.filename, s.page_number);
            println!("     {}", snippet.replace('\n', " "));
        }
    }
}

fn load_history(path: Option<&Path>) -> anyhow::Result<Vec<ChatMessage>> {
    let Some(path) = path else { return Ok(Vec::new()) };
    let text = fs::read_to_string(path).with_context(|| format!("reading history {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing history {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = parse_args()?;
    let config = Config::load().context("loading configuration")?;
    let settings = config.settings()?;
    let snapshots = SnapshotStore::new(settings.index_path(&env::current_dir()?));
    let index_name = settings.index_name.clone();
    let pipeline = RagPipeline::from_settings(settings, Arc::new(ExtractiveGenerator::new()))?;

    let rebuilding = args.cmd == "ingest" && args.rebuild;
    if !rebuilding && !pipeline.store().load(&snapshots, &index_name)? {
        tracing::info!(snapshot = %index_name, "starting from an empty index");
    }

    match args.cmd.as_str() {
        "ingest" => {
            let data_dir = args.positional.first().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data/txt"));
            println!("📥 Ingesting from {}", data_dir.display());
            let chunker = Chunker::from_settings(pipeline.settings())?;
            let files = list_txt_files(&data_dir);
            let bar = ProgressBar::new(files.len() as u64);
            bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);
            let mut chunks = Vec::new();
            for file in &files {
                bar.set_message(file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
                chunks.extend(chunker.chunk_file(file)?);
                bar.inc(1);
            }
            bar.finish_and_clear();
            let report = if args.rebuild {
                let generation = pipeline.store().replace_all(chunks)?;
                docrag_pipeline::IngestReport { documents: generation.documents().len(), chunks: generation.len(), generation: generation.id() }
            } else {
                pipeline.ingest(chunks)?
            };
            let manifest = pipeline.store().save(&snapshots, &index_name)?;
            println!("✅ Ingested {} files ({} documents, {} chunks)", files.len(), report.documents, report.chunks);
            println!("💾 Snapshot '{}' now holds {} chunks", index_name, manifest.chunk_count);
        }
        "query" => {
            let question = args.positional.first().ok_or_else(|| anyhow::anyhow!(USAGE))?;
            let history = load_history(args.history.as_deref())?;
            let response = pipeline.answer_query(question, &history).await?;
            if args.json { println!("{}", serde_json::to_string_pretty(&response)?); } else { print_response(&response); }
        }
        "docs" => {
            let docs = pipeline.documents();
            if args.json { println!("{}", serde_json::to_string_pretty(&docs)?); return Ok(()); }
            println!("📄 {} indexed documents", docs.len());
            for d in docs { println!("  {}  {}  ({} chunks)", d.doc_id, d.filename, d.total_chunks); }
        }
        other => anyhow::bail!("unknown command {other}\n{USAGE}"),
    }
    Ok(())
}
