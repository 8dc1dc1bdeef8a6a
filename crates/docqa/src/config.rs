//! TOML configuration parsing and validation.
//!
//! Every tunable constant of the pipelines lives here: upload ceilings,
//! chunking geometry, batch sizes, retrieval defaults, and model
//! identifiers. All sections have defaults, so an empty file (or a
//! defaulted `Config` in tests) is valid.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docqa_core::store::DistanceMeasure;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Records removed per atomic delete batch during cascades.
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            delete_batch_size: default_delete_batch_size(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/docqa.sqlite")
}
fn default_delete_batch_size() -> usize {
    450
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Hard ceiling on the accepted payload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Text beyond this many chars is truncated, not rejected.
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    /// Prefix of the raw text cached for the lexical fallback.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Raw text is sharded into parts of this many chars.
    #[serde(default = "default_part_chars")]
    pub part_chars: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            max_text_chars: default_max_text_chars(),
            preview_chars: default_preview_chars(),
            part_chars: default_part_chars(),
        }
    }
}

fn default_max_upload_bytes() -> usize {
    1024 * 1024
}
fn default_max_text_chars() -> usize {
    900_000
}
fn default_preview_chars() -> usize {
    50_000
}
fn default_part_chars() -> usize {
    180_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_target_chars")]
    pub target_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    /// Chunk text beyond this length is truncated before embedding.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chars: default_target_chars(),
            overlap_chars: default_overlap_chars(),
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

fn default_target_chars() -> usize {
    1000
}
fn default_overlap_chars() -> usize {
    200
}
fn default_max_chunk_chars() -> usize {
    700
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Chunk records committed per atomic batch.
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_index_batch_size(),
        }
    }
}

fn default_index_batch_size() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Nearest chunks requested per question.
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub distance_measure: DistanceMeasure,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            distance_measure: DistanceMeasure::default(),
        }
    }
}

fn default_k() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_embed_dims")]
    pub embed_dims: usize,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            embed_model: default_embed_model(),
            embed_dims: default_embed_dims(),
            chat_model: default_chat_model(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embed_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embed_dims() -> usize {
    1536
}
fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.target_chars == 0 {
        anyhow::bail!("chunking.target_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.target_chars {
        anyhow::bail!("chunking.overlap_chars must be smaller than chunking.target_chars");
    }
    if config.chunking.max_chunk_chars == 0 {
        anyhow::bail!("chunking.max_chunk_chars must be > 0");
    }
    if config.indexing.batch_size == 0 {
        anyhow::bail!("indexing.batch_size must be >= 1");
    }
    if config.store.delete_batch_size == 0 {
        anyhow::bail!("store.delete_batch_size must be >= 1");
    }
    if config.retrieval.k == 0 {
        anyhow::bail!("retrieval.k must be >= 1");
    }
    if config.upload.max_upload_bytes == 0 {
        anyhow::bail!("upload.max_upload_bytes must be > 0");
    }
    if config.models.embed_dims == 0 {
        anyhow::bail!("models.embed_dims must be > 0");
    }
    Ok(())
}
