//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`APP_RAG__TOP_K_DENSE=8` sets `rag.top_k_dense`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{FusionPolicy, PipelineVariant};
use crate::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Self::defaults().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        tracing::debug!(env = %env_name, "configuration loaded");
        Ok(config)
    }

    /// Defaults overlaid with an in-memory TOML document. No files or env vars are read.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Self { figment: Self::defaults().merge(Toml::string(toml)) };
        config.settings()?;
        Ok(config)
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::default("rag", RagSettings::default()))
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// The validated `[rag]` section.
    pub fn settings(&self) -> Result<RagSettings> {
        let settings: RagSettings = self.get("rag")?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Retrieval, gating and generation knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub reranker_model: String,
    pub top_k_lexical: usize,
    pub top_k_dense: usize,
    pub top_k_reranked: usize,
    /// Final list length for weighted fusion.
    pub top_k_retrieval: usize,
    pub confidence_threshold: f64,
    pub max_retrieval_loops: u32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub fusion: FusionPolicy,
    pub variant: PipelineVariant,
    /// When false the gate reads fused scores directly (weighted fusion only).
    pub rerank: bool,
    pub dense_weight: f32,
    pub lexical_weight: f32,
    pub generation_timeout_ms: u64,
    pub reformulation_suffix: String,
    pub history_turns: usize,
    pub vague_word_limit: usize,
    pub index_dir: String,
    pub index_name: String,
    pub expansion: ExpansionSettings,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            embedding_model: "hashing-384".to_string(),
            embedding_dim: 384,
            reranker_model: "term-overlap".to_string(),
            top_k_lexical: 5,
            top_k_dense: 5,
            top_k_reranked: 3,
            top_k_retrieval: 5,
            confidence_threshold: 0.5,
            max_retrieval_loops: 2,
            chunk_size: 1000,
            chunk_overlap: 200,
            fusion: FusionPolicy::SetUnion,
            variant: PipelineVariant::Classic,
            rerank: true,
            dense_weight: 0.6,
            lexical_weight: 0.4,
            generation_timeout_ms: 30_000,
            reformulation_suffix: " legal precedent".to_string(),
            history_turns: 4,
            vague_word_limit: 8,
            index_dir: "data/indexes".to_string(),
            index_name: "default".to_string(),
            expansion: ExpansionSettings::default(),
        }
    }
}

impl RagSettings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };
        if self.chunk_size == 0 {
            return invalid("chunk_size must be positive".into());
        }
        if self.chunk_overlap >= self.chunk_size {
            return invalid(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return invalid(format!("confidence_threshold {} outside [0, 1]", self.confidence_threshold));
        }
        if self.max_retrieval_loops == 0 {
            return invalid("max_retrieval_loops must be at least 1".into());
        }
        for (name, k) in [
            ("top_k_lexical", self.top_k_lexical),
            ("top_k_dense", self.top_k_dense),
            ("top_k_reranked", self.top_k_reranked),
            ("top_k_retrieval", self.top_k_retrieval),
            ("embedding_dim", self.embedding_dim),
        ] {
            if k == 0 {
                return invalid(format!("{name} must be positive"));
            }
        }
        let weights_ok = |w: f32| w.is_finite() && w >= 0.0;
        if !weights_ok(self.dense_weight) || !weights_ok(self.lexical_weight) {
            return invalid("fusion weights must be finite and non-negative".into());
        }
        let weight_sum = self.dense_weight + self.lexical_weight;
        if weight_sum <= 0.0 {
            return invalid("fusion weights must not both be zero".into());
        }
        // fused scores must stay in [0, 1] to be comparable with the threshold
        if weight_sum > 1.0 + 1e-6 {
            return invalid(format!(
                "dense_weight + lexical_weight = {weight_sum} exceeds 1"
            ));
        }
        if !self.rerank && self.fusion == FusionPolicy::SetUnion {
            return invalid("set_union fusion produces no scores; it requires rerank = true".into());
        }
        if self.generation_timeout_ms == 0 {
            return invalid("generation_timeout_ms must be positive".into());
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    /// Directory holding this index's snapshot, resolved against `base`.
    pub fn index_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.index_dir)
    }
}

/// Term → related-terms table appended to queries before retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionSettings {
    pub enabled: bool,
    pub max_terms_per_match: usize,
    pub terms: BTreeMap<String, Vec<String>>,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self { enabled: true, max_terms_per_match: 2, terms: BTreeMap::new() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
