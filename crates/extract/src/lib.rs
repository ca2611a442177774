pub mod error;
pub mod parser;
pub mod prompt;
pub mod schema;
pub mod writer;

pub use error::{ContractError, ExtractError};
pub use parser::parse_response;
pub use prompt::{PromptContract, REQUIRED_KEYS};
pub use schema::{Endpoint, RequirementsSpec};
pub use writer::write_spec;

use std::path::Path;
use tracing::{info, warn};

/// A parsed requirements spec and the contract keys it lacks.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub spec: RequirementsSpec,
    pub missing_keys: Vec<&'static str>,
}

/// Turns already-fetched LLM answers into requirements specs.
///
/// The extractor never calls the LLM itself; retrieval hands it the response.
pub struct Extractor {
    contract: PromptContract,
}

impl Extractor {
    pub fn new(contract: PromptContract) -> Self {
        Self { contract }
    }

    /// Parse a response. Keys the contract asked for but the LLM left out are
    /// reported as a warning, not an error.
    pub fn extract(&self, raw: &str) -> Result<Extraction, ExtractError> {
        let spec = parse_response(raw)?;

        let missing_keys = self.contract.missing_keys(&spec);
        if !missing_keys.is_empty() {
            warn!(
                contract_version = self.contract.version,
                missing = ?missing_keys,
                "LLM output is missing contract keys"
            );
        }

        Ok(Extraction { spec, missing_keys })
    }

    /// Parse a response and persist it. Nothing is written if parsing fails.
    pub async fn extract_and_persist(
        &self,
        raw: &str,
        output_path: &Path,
    ) -> Result<Extraction, ExtractError> {
        let extraction = self.extract(raw)?;
        write_spec(&extraction.spec, output_path).await?;
        info!(path = %output_path.display(), "Written requirements spec");
        Ok(extraction)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(PromptContract::v1())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FENCED: &str = "Here is the result:\n```json\n{\"endpoints\": [], \"logic\": \"none\", \"schema\": \"none\", \"auth\": \"none\"}\n```";

    #[tokio::test]
    async fn test_extract_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requirements.json");

        let extraction = Extractor::default().extract_and_persist(FENCED, &path).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "{\n  \"endpoints\": [],\n  \"logic\": \"none\",\n  \"schema\": \"none\",\n  \"auth\": \"none\"\n}\n"
        );
        assert!(extraction.missing_keys.is_empty());
        let reparsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(reparsed, serde_json::Value::Object(extraction.spec.into_object()));
    }

    #[tokio::test]
    async fn test_written_keys_keep_llm_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requirements.json");
        let raw = r#"{"schema": "S", "auth": "A", "endpoints": [], "logic": "L"}"#;

        Extractor::default().extract_and_persist(raw, &path).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\n  \"schema\": \"S\",\n  \"auth\": \"A\",\n  \"endpoints\": [],\n  \"logic\": \"L\"\n}\n"
        );
    }

    #[tokio::test]
    async fn test_extract_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requirements.json");
        let extractor = Extractor::default();

        extractor.extract_and_persist(FENCED, &path).await.unwrap();
        let first = std::fs::read(&path).unwrap();
        extractor.extract_and_persist(FENCED, &path).await.unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_refusal_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("requirements.json");

        let err = Extractor::default()
            .extract_and_persist("Sorry, I cannot help with that.", &path)
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::NotFound { .. }));
        assert!(!path.exists());
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_malformed_leaves_existing_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requirements.json");
        std::fs::write(&path, "previous run").unwrap();

        let err = Extractor::default()
            .extract_and_persist("{\"logic\": oops}", &path)
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::MalformedJson { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous run");
    }

    #[test]
    fn test_missing_keys_still_extracted() {
        let extraction = Extractor::default().extract(r#"{"logic": "only logic"}"#).unwrap();
        assert_eq!(extraction.spec.as_object().get("logic"), Some(&json!("only logic")));
        assert_eq!(extraction.missing_keys, vec!["endpoints", "schema", "auth"]);
    }
}
