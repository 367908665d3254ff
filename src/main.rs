//! mcq-eval CLI
//!
//! Builds the passage index, answers single questions, and evaluates
//! answering backends on multiple-choice datasets.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rag_mcq_eval::{
    backend::{AnswerBackend, BackendKind, MultipleChoiceWrapper, build_backend},
    config::Config,
    embed::{Embedder, HttpEmbedder},
    eval::{Dataset, EvaluationPipeline},
    llm::{LanguageModel, LlmClient},
    persistence::{IndexHandle, SaveFormat, ensure_index},
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Retrieval-augmented multiple-choice answering and evaluation
#[derive(Parser)]
#[command(name = "mcq-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Embed with a local BERT model instead of the embeddings API
    #[cfg(feature = "local-embeddings")]
    #[arg(long, global = true)]
    local_embeddings: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a backend on a grade or subject dataset
    Run {
        /// Answering strategy
        #[arg(short, long, value_enum, default_value_t = BackendKind::Baseline)]
        backend: BackendKind,

        /// Grade directory under the dataset root
        #[arg(short, long, default_value = "grade_10")]
        grade: String,

        /// Subject directory; every subject of the grade when omitted
        #[arg(short, long)]
        subject: Option<String>,

        /// Evaluate at most this many questions (0 means all)
        #[arg(short, long)]
        max_questions: Option<usize>,

        /// Write the full report as JSON
        #[arg(short, long)]
        output_file: Option<PathBuf>,

        /// Override the dataset root from the configuration
        #[arg(long)]
        dataset_root: Option<PathBuf>,
    },

    /// Answer a single question
    Ask {
        /// The question text
        question: String,

        /// Answering strategy
        #[arg(short, long, value_enum, default_value_t = BackendKind::Baseline)]
        backend: BackendKind,

        /// Constrain the reply to one of A, B, C, D
        #[arg(long)]
        mcq: bool,
    },

    /// Build the passage index, or load it if it already exists
    Index {
        /// On-disk format used when the index is built
        #[arg(short, long, value_enum, default_value_t = IndexFormat::Bin)]
        format: IndexFormat,
    },

    /// Test LLM connection
    Test,
}

#[derive(Clone, Copy, ValueEnum)]
enum IndexFormat {
    Json,
    Bin,
}

impl From<IndexFormat> for SaveFormat {
    fn from(format: IndexFormat) -> Self {
        match format {
            IndexFormat::Json => SaveFormat::Json,
            IndexFormat::Bin => SaveFormat::Bincode,
        }
    }
}

fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result = match &cli.command {
        Commands::Run {
            backend,
            grade,
            subject,
            max_questions,
            output_file,
            dataset_root,
        } => {
            cmd_run(
                &cli,
                *backend,
                grade,
                subject.as_deref(),
                *max_questions,
                output_file.as_ref(),
                dataset_root.as_ref(),
            )
            .await
        }
        Commands::Ask {
            question,
            backend,
            mcq,
        } => cmd_ask(&cli, question, *backend, *mcq).await,
        Commands::Index { format } => cmd_index(&cli, (*format).into()).await,
        Commands::Test => cmd_test().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<Config> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[allow(unused_variables)]
fn make_embedder(cli: &Cli, config: &Config) -> Result<Arc<dyn Embedder>> {
    #[cfg(feature = "local-embeddings")]
    {
        if cli.local_embeddings {
            info!("loading local embedding model");
            let local = rag_mcq_eval::embed::LocalEmbedder::load_minilm()
                .context("Failed to load local embedding model")?;
            return Ok(Arc::new(local));
        }
    }
    Ok(Arc::new(HttpEmbedder::new(config.resolved_embedding())))
}

async fn open_index(
    config: &Config,
    embedder: &dyn Embedder,
    format: SaveFormat,
) -> Result<IndexHandle> {
    ensure_index(
        &config.paths.storage_dir,
        &config.paths.corpus_dir,
        &config.retrieval.chunk,
        embedder,
        format,
    )
    .await
    .with_context(|| {
        format!(
            "Failed to prepare index in '{}'",
            config.paths.storage_dir.display()
        )
    })
}

async fn open_backend(cli: &Cli, config: &Config, kind: BackendKind) -> Result<Box<dyn AnswerBackend>> {
    let embedder = make_embedder(cli, config)?;
    let index = open_index(config, embedder.as_ref(), SaveFormat::Bincode).await?;
    let llm: Arc<dyn LanguageModel> = Arc::new(LlmClient::new(config.llm.clone()));

    info!(backend = %kind, passages = index.store.len(), model = %config.llm.model, "backend ready");
    build_backend(kind, &config.retrieval, &index, llm, embedder)
        .context("Failed to build backend")
}

async fn cmd_run(
    cli: &Cli,
    kind: BackendKind,
    grade: &str,
    subject: Option<&str>,
    max_questions: Option<usize>,
    output_file: Option<&PathBuf>,
    dataset_root: Option<&PathBuf>,
) -> Result<()> {
    let config = load_config()?;
    let root = dataset_root.unwrap_or(&config.paths.dataset_root);

    info!(backend = %kind, grade, subject = subject.unwrap_or("*"), "starting evaluation");

    let dataset = Dataset::load_capped(root, grade, subject, max_questions)
        .context("Failed to load dataset")?;

    let backend = open_backend(cli, &config, kind).await?;
    let pipeline = EvaluationPipeline::new(MultipleChoiceWrapper::new(backend));
    let report = pipeline.run(&dataset.items, grade, subject).await;

    report.print_summary();

    if let Some(path) = output_file {
        report
            .save_json(path)
            .with_context(|| format!("Failed to save results to '{}'", path.display()))?;
        info!(path = %path.display(), "results saved");
    }

    Ok(())
}

async fn cmd_ask(cli: &Cli, question: &str, kind: BackendKind, mcq: bool) -> Result<()> {
    let config = load_config()?;
    let backend = open_backend(cli, &config, kind).await?;

    let start = Instant::now();
    let answer = if mcq {
        MultipleChoiceWrapper::new(backend).get_answer(question).await
    } else {
        backend.get_answer(question).await
    };
    let answer = answer.context("Failed to answer question")?;

    println!("{}", answer);
    info!(elapsed = ?start.elapsed(), "answered");
    Ok(())
}

async fn cmd_index(cli: &Cli, format: SaveFormat) -> Result<()> {
    let config = load_config()?;
    let embedder = make_embedder(cli, &config)?;

    let start = Instant::now();
    let index = open_index(&config, embedder.as_ref(), format).await?;

    println!("Passage Index");
    println!("{}", "─".repeat(40));
    println!("  Passages:     {}", index.store.len());
    if let Some(dim) = index.store.dimension() {
        println!("  Dimensions:   {}", dim);
    }
    println!("  Storage:      {}", index.storage_dir.display());
    println!("  Elapsed:      {:.2?}", start.elapsed());

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!(
        "  API Key:   {}...",
        config.llm.api_key.chars().take(8).collect::<String>()
    );
    println!();

    config.validate().context("Invalid configuration")?;

    let client = LlmClient::new(config.llm);

    println!("Sending test request...");
    client
        .test_connection()
        .await
        .context("Connection failed")?;
    println!("Connection successful!");

    Ok(())
}
