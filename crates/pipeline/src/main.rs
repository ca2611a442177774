use clap::{Parser, Subcommand};
use pipeline::{IndexConfig, Pipeline, PipelineConfig, PipelineError, RunOptions, write_json};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "srs-pipeline")]
#[command(about = "Extract backend requirements from an SRS document and scaffold a project")]
struct Cli {
    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a document, ask the LLM and write the requirements spec
    Run {
        /// SRS document (.txt, .pdf or .docx)
        document: PathBuf,

        #[arg(short, long, default_value = "requirements.json")]
        output: PathBuf,

        #[arg(long, default_value = query::DEFAULT_QUESTION)]
        question: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long, default_value_t = query::DEFAULT_TOP_K)]
        top_k: usize,

        #[arg(long)]
        collection: Option<String>,

        /// Scaffold a backend project under this directory afterwards
        #[arg(long)]
        scaffold: Option<PathBuf>,

        /// Keep vectors in process memory instead of the vector database
        #[arg(long)]
        in_memory: bool,
    },

    /// Ingest and index a document into the vector database only
    Ingest {
        document: PathBuf,

        #[arg(long)]
        collection: Option<String>,
    },

    /// Extract the requirements spec from a saved LLM response
    Extract {
        response: PathBuf,

        #[arg(short, long, default_value = "requirements.json")]
        output: PathBuf,
    },

    /// Scaffold an empty backend project
    Scaffold {
        #[arg(long, default_value = "output")]
        base: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // Logs go to stderr; stdout carries the requirements JSON
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

async fn execute(command: Command) -> pipeline::Result<()> {
    match command {
        Command::Run {
            document,
            output,
            question,
            top_k,
            collection,
            scaffold,
            in_memory,
        } => {
            let mut config = PipelineConfig::from_env(in_memory)?;
            if let Some(collection) = collection {
                config.index.collection = collection;
            }
            info!(?config, "Configuration loaded");

            let pipeline = Pipeline::from_config(&config)?;

            let mut options = RunOptions::new(document, output);
            options.question = question;
            options.top_k = top_k;
            options.scaffold_dir = scaffold;

            let report = pipeline.run(&options).await?;
            info!(
                chunks = report.ingest.chunks,
                sources = report.sources,
                output = %report.output.display(),
                "Pipeline complete"
            );
            if let Some(project) = &report.project_dir {
                info!(path = %project.display(), "Project ready");
            }
            write_json(std::io::stdout().lock(), &report.spec)
        }

        Command::Ingest {
            document,
            collection,
        } => {
            // An in-memory store would be gone when the process exits
            let mut config = IndexConfig::from_env(false)?;
            if let Some(collection) = collection {
                config.collection = collection;
            }

            let indexer = index::Indexer::new(
                pipeline::build_embedder(&config),
                pipeline::build_store(&config),
            );
            let report =
                pipeline::ingest_document(&indexer, &document, &Default::default()).await?;
            write_json(std::io::stdout().lock(), &report)
        }

        Command::Extract { response, output } => {
            let extraction = pipeline::extract_file(&response, &output).await?;
            write_json(std::io::stdout().lock(), &extraction.spec)
        }

        Command::Scaffold { base } => {
            let project = scaffold::scaffold_project(&base)
                .await
                .map_err(PipelineError::Scaffold)?;
            println!("{}", project.display());
            Ok(())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match execute(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(exit_code = e.exit_code(), "{e:#}");
            ExitCode::from(e.exit_code())
        }
    }
}
