use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const VECTOR_DB_URL: &str = "VECTOR_DB_URL";
pub const VECTOR_COLLECTION: &str = "VECTOR_COLLECTION";
pub const EMBEDDING_URL: &str = "EMBEDDING_URL";
pub const EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const GROQ_MODEL_NAME: &str = "GROQ_MODEL_NAME";
pub const GROQ_BASE_URL: &str = "GROQ_BASE_URL";
pub const LLM_TIMEOUT_SECS: &str = "LLM_TIMEOUT_SECS";

pub const DEFAULT_COLLECTION: &str = "srs_documents";
pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration missing: {0} is not set")]
    Missing(&'static str),

    #[error("Configuration invalid: {var}={value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorStoreConfig {
    /// Qdrant REST endpoint
    Qdrant { url: String },
    InMemory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub store: VectorStoreConfig,
    pub collection: String,
    pub embedding_url: String,
    pub embedding_model: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

// Keep the key out of logs
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Everything the remote stages need, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub index: IndexConfig,
    pub llm: LlmConfig,
}

/// Non-empty value of `var`, if any.
fn value<F>(lookup: &F, var: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    value(lookup, var).ok_or(ConfigError::Missing(var))
}

impl IndexConfig {
    /// `in_memory` replaces the vector database, so its URL is not required.
    pub fn from_lookup<F>(lookup: F, in_memory: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = if in_memory {
            VectorStoreConfig::InMemory
        } else {
            VectorStoreConfig::Qdrant {
                url: required(&lookup, VECTOR_DB_URL)?,
            }
        };

        Ok(Self {
            store,
            collection: value(&lookup, VECTOR_COLLECTION)
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            embedding_url: value(&lookup, EMBEDDING_URL)
                .unwrap_or_else(|| DEFAULT_EMBEDDING_URL.to_string()),
            embedding_model: value(&lookup, EMBEDDING_MODEL)
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        })
    }

    pub fn from_env(in_memory: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok(), in_memory)
    }
}

impl LlmConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(&lookup, GROQ_API_KEY)?;

        let timeout_secs = match value(&lookup, LLM_TIMEOUT_SECS) {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: LLM_TIMEOUT_SECS,
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_LLM_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            model: value(&lookup, GROQ_MODEL_NAME)
                .unwrap_or_else(|| query::llm::DEFAULT_MODEL.to_string()),
            base_url: value(&lookup, GROQ_BASE_URL)
                .unwrap_or_else(|| query::llm::DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }
}

impl PipelineConfig {
    pub fn from_lookup<F>(lookup: F, in_memory: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            index: IndexConfig::from_lookup(&lookup, in_memory)?,
            llm: LlmConfig::from_lookup(&lookup)?,
        })
    }

    pub fn from_env(in_memory: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok(), in_memory)
    }
}
