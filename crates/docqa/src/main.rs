//! # docqa CLI
//!
//! The `docqa` binary operates a local instance of the Q&A engine backed
//! by SQLite and the OpenAI API.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and run schema migrations |
//! | `docqa add <file>` | Upload a `.txt` file and wait for indexing |
//! | `docqa ask "<question>"` | Ask a question over the indexed documents |
//! | `docqa list` | List documents, newest first |
//! | `docqa rm <id>` | Delete a document and everything under it |
//!
//! `add` and `ask` call the OpenAI API and require `OPENAI_API_KEY` in
//! the environment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use docqa::config::{load_config, Config};
use docqa::db;
use docqa::delete::delete_document;
use docqa::ingest::{upload_document, UploadRequest};
use docqa::openai::OpenAiClient;
use docqa::query::{answer_query, QueryRequest};
use docqa::sqlite_store::SqliteStore;
use docqa_core::models::DocStatus;
use docqa_core::store::{DistanceMeasure, Store};

/// docqa — a retrieval-augmented Q&A engine for plain-text documents.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Ask questions over your own plain-text documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Upload a `.txt` file and wait for background indexing to finish.
    Add {
        /// Path to the text file to ingest.
        file: PathBuf,
    },

    /// Ask a question over the indexed documents.
    Ask {
        question: String,

        /// Nearest chunks to retrieve (overrides the configured default).
        #[arg(long)]
        k: Option<usize>,

        /// Distance measure: cosine, euclidean, or dot_product.
        #[arg(long)]
        measure: Option<String>,
    },

    /// List documents, newest first.
    List,

    /// Delete a document and all of its chunks and file parts.
    Rm {
        /// Document id as shown by `docqa list`.
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&config.store).await?;
            db::run_migrations(&pool).await?;
            println!("database initialized at {}", config.store.path.display());
        }
        Commands::Add { file } => {
            let store = Arc::new(open_store(&config).await?);
            let client = Arc::new(OpenAiClient::new(&config.models)?);

            let bytes = tokio::fs::read(&file).await?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.display().to_string());

            let doc = upload_document(
                Arc::clone(&store),
                client,
                &config,
                UploadRequest { file_name, bytes },
            )
            .await?;
            println!("accepted {} as {}", doc.name, doc.id);

            // indexing runs in the background; poll until terminal
            loop {
                tokio::time::sleep(Duration::from_millis(300)).await;
                let Some(current) = store.get_document(&doc.id).await? else {
                    anyhow::bail!("document {} disappeared while indexing", doc.id);
                };
                match current.status {
                    DocStatus::Indexing => continue,
                    DocStatus::Ready => {
                        println!("indexed {} chunks", current.num_chunks);
                        break;
                    }
                    DocStatus::Error => {
                        anyhow::bail!(
                            "indexing failed: {}",
                            current.error.unwrap_or_else(|| "unknown error".into())
                        );
                    }
                }
            }
        }
        Commands::Ask {
            question,
            k,
            measure,
        } => {
            let store = open_store(&config).await?;
            let client = OpenAiClient::new(&config.models)?;

            let distance_measure = measure.as_deref().map(parse_measure).transpose()?;
            let response = answer_query(
                &store,
                &client,
                &client,
                &config.retrieval,
                &QueryRequest {
                    question,
                    k,
                    distance_measure,
                },
            )
            .await?;

            println!("{}\n", response.answer);
            for (i, ctx) in response.contexts.iter().enumerate() {
                println!("[#{}] {} (order {})", i + 1, ctx.doc_name, ctx.order);
            }
            println!(
                "\ncompleteness: {:.2}",
                response.completeness.score
            );
            for reason in &response.completeness.reasons {
                println!("  reason: {reason}");
            }
            for missing in &response.completeness.missing {
                println!("  missing: {missing}");
            }
        }
        Commands::List => {
            let store = open_store(&config).await?;
            let docs = store.list_documents().await?;
            if docs.is_empty() {
                println!("no documents");
            }
            for doc in docs {
                println!(
                    "{}  {}  {}  chunks={}  {}",
                    doc.id,
                    doc.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
                    doc.status.as_str(),
                    doc.num_chunks,
                    doc.name
                );
            }
        }
        Commands::Rm { id } => {
            let store = open_store(&config).await?;
            delete_document(&store, config.store.delete_batch_size, &id).await?;
            println!("ok");
        }
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(&config.store).await?;
    db::run_migrations(&pool).await?;
    Ok(SqliteStore::new(pool))
}

fn parse_measure(s: &str) -> Result<DistanceMeasure> {
    match s {
        "cosine" => Ok(DistanceMeasure::Cosine),
        "euclidean" => Ok(DistanceMeasure::Euclidean),
        "dot_product" => Ok(DistanceMeasure::DotProduct),
        other => anyhow::bail!(
            "Unknown distance measure: '{}'. Use cosine, euclidean, or dot_product.",
            other
        ),
    }
}
