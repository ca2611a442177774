use std::path::PathBuf;
use thiserror::Error;

/// Why an LLM response could not be turned into a requirements spec.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No `{` or no `}` in the response. Carries the raw response.
    #[error("No JSON object found in LLM output")]
    NotFound { raw: String },

    /// A `{...}` span was found but is not valid JSON.
    #[error("Malformed JSON in LLM output: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
        candidate: String,
    },

    #[error("Failed to write requirements spec to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A prompt template that no longer honours the four-key contract.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContractError {
    #[error("Prompt template v{version} has no {{context}} slot")]
    MissingContextSlot { version: u32 },

    #[error("Prompt template v{version} has more than one {{context}} slot")]
    DuplicateContextSlot { version: u32 },

    #[error("Prompt template v{version} does not request key {key:?}")]
    MissingKey { version: u32, key: &'static str },
}
