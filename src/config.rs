//! TOML configuration parsing and validation.
//!
//! Every section except `[catalog]` has defaults, so a minimal config only
//! names the three catalog files. Relative catalog paths are resolved against
//! the directory containing the config file.
//!
//! Credentials never live in the file: `[llm].api_key_env` names the
//! environment variable holding the key, and [`Credentials::from_env`]
//! reads it once at startup.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::AdvisorError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ontology: OntologyConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub vehicles: PathBuf,
    pub ontology: PathBuf,
    pub vectors: PathBuf,
    /// Trim description documents consumed by `advisor index build`.
    #[serde(default)]
    pub docs: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_chat_model")]
    pub extract_model: String,
    #[serde(default = "default_chat_model")]
    pub finalize_model: String,
    #[serde(default = "default_extract_temperature")]
    pub extract_temperature: f32,
    #[serde(default = "default_finalize_temperature")]
    pub finalize_temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            extract_model: default_chat_model(),
            finalize_model: default_chat_model(),
            extract_temperature: default_extract_temperature(),
            finalize_temperature: default_finalize_temperature(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Falls back to `[llm].base_url` when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dims: default_dims(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_top_k")]
    pub finalize_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            finalize_limit: default_top_k(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OntologyConfig {
    /// Reject phrases with no canonical key instead of passing them through.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}
fn default_chat_model() -> String {
    "openai/gpt-4o-mini".to_string()
}
fn default_extract_temperature() -> f32 {
    0.1
}
fn default_finalize_temperature() -> f32 {
    0.2
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_embedding_model() -> String {
    "openai/text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_top_k() -> usize {
    10
}
fn default_request_timeout_secs() -> u64 {
    90
}
fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl EmbeddingConfig {
    pub fn effective_base_url<'a>(&'a self, llm: &'a LlmConfig) -> &'a str {
        self.base_url.as_deref().unwrap_or(&llm.base_url)
    }
}

/// API credentials resolved from the environment at startup.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read the API key named by `[llm].api_key_env`.
    ///
    /// A missing or empty variable is a startup-time [`AdvisorError::Config`].
    pub fn from_env(llm: &LlmConfig) -> Result<Self, AdvisorError> {
        match std::env::var(&llm.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Self { api_key: key }),
            _ => Err(AdvisorError::Config(format!(
                "{} environment variable not set",
                llm.api_key_env
            ))),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.catalog.resolve_paths(base_dir);

    validate(&config)?;

    Ok(config)
}

impl CatalogConfig {
    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        resolve(&mut self.vehicles);
        resolve(&mut self.ontology);
        resolve(&mut self.vectors);
        if let Some(docs) = self.docs.as_mut() {
            resolve(docs);
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    // Validate retrieval
    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.finalize_limit == 0 {
        bail!("retrieval.finalize_limit must be >= 1");
    }

    // Validate models
    if config.llm.extract_model.trim().is_empty() || config.llm.finalize_model.trim().is_empty()
    {
        bail!("llm.extract_model and llm.finalize_model must not be empty");
    }
    for (name, t) in [
        ("llm.extract_temperature", config.llm.extract_temperature),
        ("llm.finalize_temperature", config.llm.finalize_temperature),
    ] {
        if !(0.0..=2.0).contains(&t) {
            bail!("{} must be in [0.0, 2.0]", name);
        }
    }
    if config.llm.api_key_env.trim().is_empty() {
        bail!("llm.api_key_env must name an environment variable");
    }

    // Validate embedding
    if config.embedding.dims == 0 {
        bail!("embedding.dims must be > 0");
    }
    if config.embedding.model.trim().is_empty() {
        bail!("embedding.model must not be empty");
    }

    if config.pipeline.request_timeout_secs == 0 {
        bail!("pipeline.request_timeout_secs must be > 0");
    }

    Ok(())
}
