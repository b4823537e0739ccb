use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

use palate_core::config::Config;
use palate_core::{ChatSession, PromptBuilder};
use palate_llm::openai::OpenAiProvider;
use palate_memory::{
    Chunker, ChunkerConfig, DiskVectorStore, IngestionPipeline, QdrantStore, RetrievalConfig,
    Retriever, VectorStore,
};

#[derive(Parser)]
#[command(name = "palate", version, about = "Retrieval-augmented story chatbot")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive question answering over the corpus (default).
    Chat,
    /// Drop the index collection and re-ingest the corpus.
    Reindex,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);
    let config = Config::load(&config_path)?;
    config.validate()?;

    let provider = Arc::new(OpenAiProvider::new(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.embedding_model.clone(),
        config.llm.max_tokens,
        config.llm.temperature,
    ));

    let store: Arc<dyn VectorStore> = match &config.index.qdrant_url {
        Some(url) => {
            tracing::info!(url, "using remote Qdrant index");
            Arc::new(QdrantStore::new(url)?)
        }
        None => {
            tracing::info!(path = %config.index.path, "using local index");
            Arc::new(DiskVectorStore::open(&config.index.path)?)
        }
    };

    let corpus = std::fs::read_to_string(&config.corpus.path)
        .with_context(|| format!("failed to read corpus at {}", config.corpus.path))?;

    let pipeline = IngestionPipeline::new(
        Chunker::new(ChunkerConfig::default()),
        store.clone(),
        provider.clone(),
        config.index.collection.clone(),
    );

    match cli.command {
        Some(Command::Reindex) => {
            let report = pipeline.rebuild(&corpus).await?;
            println!(
                "Reindexed {} chunk(s), vector size {}.",
                report.chunks, report.vector_size
            );
            Ok(())
        }
        Some(Command::Chat) | None => {
            match pipeline.ensure_ingested(&corpus).await? {
                Some(report) => tracing::info!(
                    chunks = report.chunks,
                    vector_size = report.vector_size,
                    "index built"
                ),
                None => tracing::info!("index ready"),
            }

            let retriever = Retriever::new(
                store,
                provider.clone(),
                config.index.collection.clone(),
                RetrievalConfig {
                    limit: config.index.retrieve_limit,
                },
            );
            let session = ChatSession::new(provider, retriever, PromptBuilder::new());

            run_chat(session).await
        }
    }
}

async fn run_chat<P: palate_llm::LlmProvider>(mut session: ChatSession<P>) -> anyhow::Result<()> {
    println!("palate v{}", env!("CARGO_PKG_VERSION"));
    println!("Ask about the story. Type 'exit' to quit.\n");

    let stdin = tokio::io::stdin();
    let mut lines = tokio::io::BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                tracing::info!("received shutdown signal");
                break;
            }
        };

        let Some(line) = line else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        let answer = session.ask(question).await;
        println!("[{}] Palate: {answer}\n", timestamp());
    }

    println!("Bye.");
    Ok(())
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }
    if let Ok(path) = std::env::var("PALATE_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
