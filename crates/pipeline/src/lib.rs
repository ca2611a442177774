//! Runs the SRS pipeline: ingest → retrieve and ask → extract → persist.
//!
//! Stages run strictly in order and the first failure ends the run. Every
//! failure is tagged with the stage it came from so the binary can map it
//! to an exit code.

pub mod config;

pub use config::{ConfigError, IndexConfig, LlmConfig, PipelineConfig, VectorStoreConfig};

use extract::{ContractError, ExtractError, Extraction, Extractor, PromptContract, RequirementsSpec};
use index::{Embedder, EmbeddingClient, InMemoryStore, Indexer, QdrantStore, VectorStore};
use ingest::{ChunkerConfig, IngestError};
use query::{ChatModel, GroqClient, RequirementsRetriever};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Embedding service, vector store or LLM failed. The error chain is kept as is.
    #[error("Upstream service error: {0:#}")]
    Upstream(anyhow::Error),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Scaffold failed: {0:#}")]
    Scaffold(anyhow::Error),

    #[error("Failed to write result: {0}")]
    Output(#[source] std::io::Error),
}

impl PipelineError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Ingest(_) => 3,
            Self::Upstream(_) => 4,
            Self::Extract(_) => 5,
            Self::Contract(_) | Self::Scaffold(_) => 6,
            Self::Output(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub document: PathBuf,
    pub output: PathBuf,
    pub question: String,
    pub top_k: usize,
    pub chunker: ChunkerConfig,
    /// Scaffold a project under this directory after a successful extraction.
    pub scaffold_dir: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(document: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
            output: output.into(),
            question: query::DEFAULT_QUESTION.to_string(),
            top_k: query::DEFAULT_TOP_K,
            chunker: ChunkerConfig::default(),
            scaffold_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document: PathBuf,
    pub chunks: usize,
    pub dimension: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub ingest: IngestReport,
    pub sources: usize,
    pub output: PathBuf,
    pub missing_keys: Vec<&'static str>,
    pub project_dir: Option<PathBuf>,
    pub spec: RequirementsSpec,
}

pub fn build_embedder(config: &IndexConfig) -> Arc<dyn Embedder> {
    Arc::new(EmbeddingClient::new(
        config.embedding_url.clone(),
        config.embedding_model.clone(),
    ))
}

pub fn build_store(config: &IndexConfig) -> Arc<dyn VectorStore> {
    match &config.store {
        VectorStoreConfig::Qdrant { url } => {
            Arc::new(QdrantStore::new(url.clone(), config.collection.clone()))
        }
        VectorStoreConfig::InMemory => Arc::new(InMemoryStore::new()),
    }
}

pub fn build_llm(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    let client = GroqClient::new(
        config.base_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
        config.timeout,
    )
    .map_err(PipelineError::Upstream)?;
    Ok(Arc::new(client))
}

/// Load, chunk, embed and store one document.
pub async fn ingest_document(
    indexer: &Indexer,
    document: &Path,
    chunker: &ChunkerConfig,
) -> Result<IngestReport> {
    info!(path = %document.display(), "Ingesting SRS into the vector store");

    let (_, chunks) = ingest::ingest_file(document, chunker).await?;
    let stats = indexer
        .index_chunks(&chunks)
        .await
        .map_err(PipelineError::Upstream)?;

    info!(chunks = stats.chunks_indexed, "Ingestion complete");

    Ok(IngestReport {
        document: document.to_path_buf(),
        chunks: stats.chunks_indexed,
        dimension: stats.dimension,
    })
}

/// Pretty-print a result for the caller, e.g. the requirements spec on stdout.
pub fn write_json<W: Write, T: Serialize>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| PipelineError::Output(e.into()))?;
    writeln!(writer).map_err(PipelineError::Output)
}

/// Offline extraction of a saved LLM answer.
pub async fn extract_file(response_file: &Path, output: &Path) -> Result<Extraction> {
    let raw = tokio::fs::read_to_string(response_file)
        .await
        .map_err(|source| IngestError::Read {
            path: response_file.to_path_buf(),
            source,
        })?;

    Ok(Extractor::default().extract_and_persist(&raw, output).await?)
}

pub struct Pipeline {
    indexer: Indexer,
    retriever: RequirementsRetriever,
    extractor: Extractor,
}

impl Pipeline {
    /// The same embedder and store back both ingestion and retrieval.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn ChatModel>,
        contract: PromptContract,
    ) -> Result<Self> {
        let retriever =
            RequirementsRetriever::new(embedder.clone(), store.clone(), llm, contract.clone())?;

        Ok(Self {
            indexer: Indexer::new(embedder, store),
            retriever,
            extractor: Extractor::new(contract),
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(
            build_embedder(&config.index),
            build_store(&config.index),
            build_llm(&config.llm)?,
            PromptContract::v1(),
        )
    }

    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let ingest = ingest_document(&self.indexer, &options.document, &options.chunker).await?;

        let answer = self
            .retriever
            .ask(&options.question, options.top_k)
            .await
            .map_err(PipelineError::Upstream)?;

        info!(path = %options.output.display(), "Parsing requirements");
        let Extraction { spec, missing_keys } = self
            .extractor
            .extract_and_persist(&answer.response, &options.output)
            .await?;

        let project_dir = match &options.scaffold_dir {
            Some(base) => Some(
                scaffold::scaffold_project(base)
                    .await
                    .map_err(PipelineError::Scaffold)?,
            ),
            None => None,
        };

        Ok(RunReport {
            ingest,
            sources: answer.sources.len(),
            output: options.output.clone(),
            missing_keys,
            project_dir,
            spec,
        })
    }
}
