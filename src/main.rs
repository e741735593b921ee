//! # docqa CLI
//!
//! Ingest documentation files, then ask questions answered from them.
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
//! | `docqa ingest <files..> --user <id>` | Extract, chunk, embed and store files |
//! | `docqa documents` | List ingested documents |
//! | `docqa show <id>` | Print a document's metadata and chunks |
//! | `docqa delete <id>` | Delete a document, its chunks, images and file |
//! | `docqa search "<question>"` | Ranked chunks with similarity scores |
//! | `docqa ask "<question>"` | Grounded answer with sources |
//! | `docqa serve` | Start the JSON HTTP server |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`).

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use docqa::app::App;
use docqa::config::{self, Config};
use docqa::context::RequestContext;
use docqa::ingest::UploadedFile;
use docqa::{db, migrate, server};

#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Documentation question answering over your own files",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docqa.toml`. When the file does not exist the
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Ingest one or more files.
    ///
    /// Each file is processed on its own; a failure is reported and the
    /// remaining files still run.
    Ingest {
        /// Files to ingest (pdf, docx, pptx, ppt, xlsx, xls, html, htm, txt, md).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// User id recorded as the uploader.
        #[arg(long, default_value = "cli")]
        user: String,
    },

    /// List ingested documents, newest first.
    Documents,

    /// Print a document's metadata and chunks.
    Show {
        /// Document id.
        id: String,
    },

    /// Delete a document and everything derived from it.
    Delete {
        /// Document id.
        id: String,
    },

    /// Show the chunks that would ground an answer.
    Search {
        question: String,
    },

    /// Answer a question from the ingested documents.
    Ask {
        question: String,
    },

    /// Start the JSON HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = load(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&cfg).await?,
        Commands::Ingest { files, user } => run_ingest(cfg, files, user).await?,
        Commands::Documents => run_documents(cfg).await?,
        Commands::Show { id } => run_show(cfg, &id).await?,
        Commands::Delete { id } => run_delete(cfg, &id).await?,
        Commands::Search { question } => run_search(cfg, &question).await?,
        Commands::Ask { question } => run_ask(cfg, &question).await?,
        Commands::Serve => {
            let app = App::open(cfg).await?;
            server::run_server(app).await?;
        }
    }

    Ok(())
}

async fn run_init(cfg: &Config) -> Result<()> {
    let pool = db::connect(cfg).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    tokio::fs::create_dir_all(&cfg.ingest.upload_dir).await?;
    println!("Database initialized at {}", cfg.db.path.display());
    Ok(())
}

async fn run_ingest(cfg: Config, files: Vec<PathBuf>, user: String) -> Result<()> {
    let app = App::open(cfg).await?;
    let uploads: Vec<UploadedFile> = files.into_iter().map(UploadedFile::from_path).collect();
    let ctx = RequestContext::admin(user);

    let results = app.ingestor.ingest_batch(&uploads, &ctx).await;
    let mut failed = 0;
    for item in &results {
        match &item.result {
            Ok(ingested) => println!(
                "ingested {} -> {} ({} chunks, {} embedded, {} images)",
                item.original_name,
                ingested.document.id,
                ingested.chunks + ingested.image_chunks,
                ingested.embedded_chunks,
                ingested.images
            ),
            Err(e) => {
                failed += 1;
                println!("failed   {}: {}", item.original_name, e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed to ingest", failed, results.len());
    }
    Ok(())
}

async fn run_documents(cfg: Config) -> Result<()> {
    let app = App::open(cfg).await?;
    let docs = app.documents.list().await?;
    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for doc in docs {
        println!(
            "{}  {:<5} {:>10}  {}  {}  (by {})",
            doc.id,
            doc.file_type,
            doc.display_size(),
            doc.upload_date.format("%Y-%m-%d %H:%M"),
            doc.original_filename,
            doc.uploaded_by
        );
    }
    Ok(())
}

async fn run_show(cfg: Config, id: &str) -> Result<()> {
    let app = App::open(cfg).await?;
    let Some(doc) = app.documents.get(id).await? else {
        bail!("Document not found: {}", id);
    };
    let chunks = app.documents.chunks(id).await?;
    let images = app.documents.images(id).await?;

    println!("id:        {}", doc.id);
    println!("file:      {}", doc.original_filename);
    println!("type:      {}", doc.file_type);
    println!("size:      {}", doc.display_size());
    println!("stored at: {}", doc.file_path);
    println!("uploaded:  {} by {}", doc.upload_date.to_rfc3339(), doc.uploaded_by);
    println!("images:    {}", images.len());
    println!("chunks:    {}", chunks.len());
    for chunk in chunks {
        let embedded = if chunk.embedding.is_some() { "" } else { " (no embedding)" };
        println!("\n--- chunk {}{} ---", chunk.chunk_index, embedded);
        println!("{}", chunk.text);
    }
    Ok(())
}

async fn run_delete(cfg: Config, id: &str) -> Result<()> {
    let app = App::open(cfg).await?;
    match app.documents.delete(id).await? {
        Some(doc) => println!("Deleted {} ({})", doc.id, doc.original_filename),
        None => bail!("Document not found: {}", id),
    }
    Ok(())
}

async fn run_search(cfg: Config, question: &str) -> Result<()> {
    let app = App::open(cfg).await?;
    let results = app.assistant.search(question).await?;
    if results.is_empty() {
        println!("No chunks above the similarity threshold.");
        return Ok(());
    }
    for (rank, r) in results.iter().enumerate() {
        let snippet: String = r.chunk.text.chars().take(120).collect();
        println!(
            "{}. [{:.3}] {} #{}\n   {}",
            rank + 1,
            r.similarity,
            r.chunk.document_id,
            r.chunk.chunk_index,
            snippet.replace('\n', " ")
        );
    }
    Ok(())
}

async fn run_ask(cfg: Config, question: &str) -> Result<()> {
    let app = App::open(cfg).await?;
    let answer = app.assistant.answer_question(question).await?;
    println!("{}", answer.text);
    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            match source.page {
                Some(page) => println!("  [{}] {} (page {})", source.id, source.filename, page),
                None => println!("  [{}] {}", source.id, source.filename),
            }
        }
    }
    tracing::debug!(model = %answer.model_used, used_fallback = answer.used_fallback, "done");
    Ok(())
}
