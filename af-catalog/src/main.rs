//! af-catalog - command-line entry point
//!
//! Adds audio files to the catalog, queries it, and renames matched files
//! according to a `%x` path template.

use std::path::PathBuf;
use std::sync::Arc;

use af_catalog::ingest::{submit_directory, IngestPool, MessageHandler, QueueMessage};
use af_catalog::services::FileScanner;
use af_catalog::store::CatalogStore;
use af_catalog::{parse_filter, AudioLibrary, PathTemplate, SqliteCatalogStore};
use af_common::config::{load_toml_config, resolve_database_path, DATABASE_ENV_VAR};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for af-catalog
#[derive(Parser, Debug)]
#[command(name = "af-catalog")]
#[command(about = "Take control of your audio library")]
#[command(version)]
struct Args {
    /// Add the audio files under this folder to the library (the folder becomes their base path)
    #[arg(short, long, value_name = "DIR")]
    add: Option<PathBuf>,

    /// Query the library, e.g. artist=Radiohead,album='OK Computer'
    #[arg(short, long, value_name = "FILTER")]
    query: Option<String>,

    /// Rename the files matched by --query according to a pattern such as "%a/%b/%n - %t.mp3"
    #[arg(short, long, value_name = "PATTERN", requires = "query")]
    rename: Option<String>,

    /// Print renames without moving any file
    #[arg(long, requires = "rename")]
    dry_run: bool,

    /// Catalog database file
    #[arg(short, long, env = DATABASE_ENV_VAR)]
    database: Option<PathBuf>,

    /// Number of ingest workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Configuration file (default: ~/.config/audiofile/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drop every catalog table and start empty
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("af_catalog={0},af_common={0}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if args.add.is_none() && args.query.is_none() && !args.reset {
        bail!("Nothing to do: pass --add, --query or --reset (see --help)");
    }

    // Validate user input before touching the store
    let filter = args
        .query
        .as_deref()
        .map(parse_filter)
        .transpose()
        .context("Invalid query")?;
    let template = args
        .rename
        .as_deref()
        .map(PathTemplate::compile)
        .transpose()
        .context("Invalid rename pattern")?;

    let db_path = resolve_database_path(args.database.as_deref(), DATABASE_ENV_VAR, &config);
    info!("Catalog database: {}", db_path.display());

    let store = Arc::new(
        SqliteCatalogStore::open(&db_path, &config.store_settings())
            .await
            .context("Failed to open catalog")?,
    );

    if args.reset {
        store.reset().await.context("Failed to reset catalog")?;
        info!("Catalog reset");
    }

    let worker_count = args.workers.unwrap_or(config.worker_count).max(1);
    let library = AudioLibrary::new(store.clone())
        .with_scanner(FileScanner::new(&config.extensions))
        .with_worker_count(worker_count);

    if let Some(root) = &args.add {
        let handler = Arc::new(MessageHandler::new(library.clone()));
        let pool = IngestPool::<QueueMessage>::new(handler, worker_count);

        let queued = submit_directory(&pool, library.scanner(), root)
            .await
            .with_context(|| format!("Failed to scan {}", root.display()))?;
        let stats = pool.shutdown().await;

        println!(
            "Processed {} of {} files ({} failed)",
            stats.completed, queued, stats.failed
        );
    }

    if let Some(filter) = filter {
        let records = library.find(&filter).await.context("Query failed")?;

        match template {
            Some(template) if args.dry_run => {
                for record in &records {
                    match template.render_within(record) {
                        Ok(destination) => println!("{} -> {}", record.path, destination.display()),
                        Err(e) => println!("{} -> skipped: {}", record.path, e),
                    }
                }
            }
            Some(template) => {
                let handler = Arc::new(MessageHandler::new(library.clone()));
                let pool = IngestPool::<QueueMessage>::new(handler, worker_count);
                for record in records {
                    pool.submit(QueueMessage::Rename {
                        record,
                        pattern: template.as_str().to_string(),
                    })
                    .await?;
                }
                let stats = pool.shutdown().await;
                println!("Renamed {} files ({} failed)", stats.completed, stats.failed);
            }
            None => {
                for record in &records {
                    println!("{}\n", record);
                }
                println!("{} matching songs", records.len());
            }
        }
    }

    store.close().await;
    Ok(())
}
