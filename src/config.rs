//! Environment-driven configuration.
//!
//! Settings are resolved from `DOCLOOM_*` environment variables (a local
//! `.env` file is honored via `dotenvy`), with compiled defaults suitable
//! for a local Ollama setup. Components receive their knobs from
//! [`Settings`] at construction time; nothing reads the environment after
//! startup.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Errors produced while resolving configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was present but could not be parsed.
    #[error("failed to parse environment variable {key}: {message}")]
    EnvParse { key: String, message: String },
}

/// Runtime configuration for all docloom components.
#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite database file holding chunks, turns, and jobs.
    pub database_path: PathBuf,
    /// Base URL of the embedding provider (Ollama-compatible).
    pub embedding_endpoint: Url,
    /// Embedding model name. Must match between indexing and querying.
    pub embedding_model: String,
    /// Base URL of the text-generation provider (Ollama-compatible).
    pub llm_endpoint: Url,
    /// Generation model name.
    pub llm_model: String,
    /// Optional headless-browser rendering endpoint used as the scrape
    /// fallback for script-rendered pages. `None` disables the fallback.
    pub browser_endpoint: Option<Url>,
    /// Deadline for a single page fetch.
    pub fetch_timeout: Duration,
    /// Deadline for a single generation call.
    pub generation_timeout: Duration,
    /// Maximum chunk size in characters.
    pub max_chunk_size: usize,
    /// Approximate overlap carried between adjacent chunks, in characters.
    pub chunk_overlap: usize,
    /// Number of passages retrieved for general queries. Code queries
    /// retrieve twice as many.
    pub top_k: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("docloom.db"),
            embedding_endpoint: local_ollama(),
            embedding_model: "nomic-embed-text".to_string(),
            llm_endpoint: local_ollama(),
            llm_model: "llama3.1".to_string(),
            browser_endpoint: None,
            fetch_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(60),
            max_chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
        }
    }
}

fn local_ollama() -> Url {
    // Infallible: the literal is a valid URL.
    "http://localhost:11434"
        .parse()
        .expect("default endpoint literal is a valid URL")
}

impl Settings {
    /// Resolves settings from the environment, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; only load errors for present files matter.
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Ok(Self {
            database_path: env_var("DOCLOOM_DATABASE")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            embedding_endpoint: env_url("DOCLOOM_EMBEDDING_ENDPOINT")?
                .unwrap_or(defaults.embedding_endpoint),
            embedding_model: env_var("DOCLOOM_EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            llm_endpoint: env_url("DOCLOOM_LLM_ENDPOINT")?.unwrap_or(defaults.llm_endpoint),
            llm_model: env_var("DOCLOOM_LLM_MODEL").unwrap_or(defaults.llm_model),
            browser_endpoint: env_url("DOCLOOM_BROWSER_ENDPOINT")?,
            fetch_timeout: env_secs("DOCLOOM_FETCH_TIMEOUT_SECS")?
                .unwrap_or(defaults.fetch_timeout),
            generation_timeout: env_secs("DOCLOOM_GENERATION_TIMEOUT_SECS")?
                .unwrap_or(defaults.generation_timeout),
            max_chunk_size: env_usize("DOCLOOM_MAX_CHUNK_SIZE")?
                .unwrap_or(defaults.max_chunk_size),
            chunk_overlap: env_usize("DOCLOOM_CHUNK_OVERLAP")?.unwrap_or(defaults.chunk_overlap),
            top_k: env_usize("DOCLOOM_TOP_K")?.unwrap_or(defaults.top_k),
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_url(key: &str) -> Result<Option<Url>, ConfigError> {
    env_var(key)
        .map(|raw| {
            raw.parse::<Url>().map_err(|err| ConfigError::EnvParse {
                key: key.to_string(),
                message: err.to_string(),
            })
        })
        .transpose()
}

fn env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    env_var(key)
        .map(|raw| {
            raw.parse::<usize>().map_err(|err| ConfigError::EnvParse {
                key: key.to_string(),
                message: err.to_string(),
            })
        })
        .transpose()
}

fn env_secs(key: &str) -> Result<Option<Duration>, ConfigError> {
    Ok(env_usize(key)?.map(|secs| Duration::from_secs(secs as u64)))
}
