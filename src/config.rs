//! Runtime settings, loaded from the environment.
//!
//! Every knob has a default that matches a small local deployment; `.env`
//! files are honored via `dotenvy` so development setups need no exported
//! shell variables.

use std::path::PathBuf;
use std::time::Duration;

/// Assistant-wide configuration.
#[derive(Clone, Debug)]
pub struct Settings {
    /// API key for the OpenAI-compatible completion/embedding endpoint.
    pub api_key: String,
    /// Base URL of the OpenAI-compatible endpoint.
    pub api_base: String,
    /// Chat model used by the classifier, refinement, and answer stages.
    pub completion_model: String,
    /// Embedding model used for chunking and retrieval.
    pub embedding_model: String,
    /// Directory holding the default document corpus ingested at bootstrap.
    pub source_dir: PathBuf,
    /// Canonical path of the persisted vector index.
    pub index_path: PathBuf,
    /// Number of chunks retrieved per query.
    pub retrieval_k: usize,
    /// Minimum chunk size in characters; smaller chunks are merged forward.
    pub min_chunk_size: usize,
    /// Breakpoint sensitivity in `[0, 1]`; higher splits more eagerly.
    pub breakpoint_threshold: f32,
    /// Deadline applied to each external completion/embedding call.
    pub call_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.openai.com/v1".to_string(),
            completion_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            source_dir: PathBuf::from("source_docs"),
            index_path: PathBuf::from("source_docs_index.sqlite"),
            retrieval_k: 10,
            min_chunk_size: 300,
            breakpoint_threshold: 0.5,
            call_timeout: Duration::from_secs(45),
        }
    }
}

impl Settings {
    /// Loads settings from the environment, falling back to defaults.
    ///
    /// Reads a `.env` file first when present. Unparseable numeric values
    /// fall back to their defaults rather than failing startup.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            api_key: env_or("AQARCHAT_API_KEY", &defaults.api_key),
            api_base: env_or("AQARCHAT_API_BASE", &defaults.api_base),
            completion_model: env_or("AQARCHAT_COMPLETION_MODEL", &defaults.completion_model),
            embedding_model: env_or("AQARCHAT_EMBEDDING_MODEL", &defaults.embedding_model),
            source_dir: PathBuf::from(env_or(
                "AQARCHAT_SOURCE_DIR",
                &defaults.source_dir.display().to_string(),
            )),
            index_path: PathBuf::from(env_or(
                "AQARCHAT_INDEX_PATH",
                &defaults.index_path.display().to_string(),
            )),
            retrieval_k: env_parsed("AQARCHAT_RETRIEVAL_K", defaults.retrieval_k),
            min_chunk_size: env_parsed("AQARCHAT_MIN_CHUNK_SIZE", defaults.min_chunk_size),
            breakpoint_threshold: env_parsed(
                "AQARCHAT_BREAKPOINT_THRESHOLD",
                defaults.breakpoint_threshold,
            ),
            call_timeout: Duration::from_secs(env_parsed(
                "AQARCHAT_CALL_TIMEOUT_SECS",
                defaults.call_timeout.as_secs(),
            )),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.retrieval_k, 10);
        assert_eq!(settings.min_chunk_size, 300);
        assert!(settings.breakpoint_threshold > 0.0 && settings.breakpoint_threshold <= 1.0);
    }
}
