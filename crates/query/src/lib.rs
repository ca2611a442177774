pub mod llm;
pub mod retry;

pub use llm::{ChatModel, GroqClient};
pub use retry::RetryPolicy;

use anyhow::{Context, Result};
use extract::{ContractError, PromptContract};
use index::{Embedder, ScoredChunk, VectorStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_QUESTION: &str =
    "Extract the functional requirements from the document for upcoming project.";
pub const DEFAULT_TOP_K: usize = 5;

/// Raw LLM answer plus the chunks it was given.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalAnswer {
    pub response: String,
    pub sources: Vec<ScoredChunk>,
    pub contract_version: u32,
}

/// Retrieves the chunks closest to a question and asks the LLM to extract
/// requirements from them using the prompt contract.
pub struct RequirementsRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn ChatModel>,
    contract: PromptContract,
}

impl RequirementsRetriever {
    /// Fails if the contract's template no longer requests every required key.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn ChatModel>,
        contract: PromptContract,
    ) -> std::result::Result<Self, ContractError> {
        contract.validate()?;
        Ok(Self {
            embedder,
            store,
            llm,
            contract,
        })
    }

    /// The question only drives retrieval; the prompt itself is the contract
    /// template filled with the retrieved chunks.
    pub async fn ask(&self, question: &str, top_k: usize) -> Result<RetrievalAnswer> {
        info!(question, top_k, "Running retrieval");

        let query_embedding = self.embedder
            .embed(question)
            .await
            .context("Failed to embed question")?;

        let sources = self.store
            .search(&query_embedding, top_k)
            .await
            .context("Failed to search vector store")?;

        if sources.is_empty() {
            warn!("No chunks retrieved; asking the LLM with an empty context");
        }

        let context = build_context(&sources);
        let prompt = self.contract.render(&context);

        let response = self.llm
            .complete(&prompt)
            .await
            .context("LLM completion failed")?;

        info!(chunks = sources.len(), "Retrieval complete");

        Ok(RetrievalAnswer {
            response,
            sources,
            contract_version: self.contract.version,
        })
    }
}

/// Retrieved chunk texts in rank order, separated by blank lines.
pub fn build_context(sources: &[ScoredChunk]) -> String {
    sources
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
