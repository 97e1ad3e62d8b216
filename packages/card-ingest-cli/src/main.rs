//! Card ingestion CLI
//!
//! Feeds card photos from disk through the ingestion pipeline and prints
//! the per-image results as JSON on stdout. Logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use card_ingest::{
    BatchOrchestrator, BatchSummary, CardIngestionPipeline, Config, FsAssetStore,
    GeminiExtractor, ImageUpload, PipelineOptions, PipelineResult, SqliteCatalog,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Pipeline = CardIngestionPipeline<GeminiExtractor, FsAssetStore, SqliteCatalog>;

#[derive(Parser)]
#[command(name = "card-ingest", about = "Register trading card photos in the catalog")]
struct Cli {
    /// Delete stored photos whose card could not be read
    #[arg(long, global = true)]
    discard_unreadable: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a single photo
    Ingest { file: PathBuf },

    /// Ingest several photos in order, paced for the extraction rate limit
    IngestBatch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print every registered card
    List,
}

#[derive(Serialize)]
struct BatchOutput {
    results: Vec<PipelineResult>,
    summary: BatchSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,card_ingest=debug,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;
    tracing::info!(
        "Catalog at {}, assets in {}, model {}",
        config.catalog_database_url,
        config.asset_dir.display(),
        config.credentials.model
    );

    let pipeline = build_pipeline(&config, cli.discard_unreadable).await?;

    match cli.command {
        Command::Ingest { file } => {
            let upload = read_upload(&file).await?;
            let result = pipeline.ingest(&upload).await;
            print_json(&result)?;
        }
        Command::IngestBatch { files } => {
            let mut uploads = Vec::with_capacity(files.len());
            for file in &files {
                uploads.push(read_upload(file).await?);
            }

            let batch = BatchOrchestrator::new(pipeline).with_config(config.batch.clone());
            let results = batch.run_batch(&uploads).await;
            let summary = BatchSummary::from_results(&results);
            print_json(&BatchOutput { results, summary })?;
        }
        Command::List => {
            let listing = pipeline
                .list_catalog()
                .await
                .context("Failed to read the catalog")?;
            print_json(&listing)?;
        }
    }

    Ok(())
}

async fn build_pipeline(config: &Config, discard_unreadable: bool) -> Result<Pipeline> {
    let extractor = GeminiExtractor::new(config.credentials.clone())
        .context("Failed to create extraction client")?;
    let assets = FsAssetStore::new(&config.asset_dir)
        .await
        .with_context(|| format!("Failed to open asset folder {}", config.asset_dir.display()))?;
    let catalog = SqliteCatalog::new(&config.catalog_database_url)
        .await
        .context("Failed to open catalog database")?;

    Ok(CardIngestionPipeline::new(extractor, assets, catalog)
        .with_options(PipelineOptions::new().with_discard_unreadable(discard_unreadable)))
}

async fn read_upload(path: &Path) -> Result<ImageUpload> {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        bail!("{} has no usable file name", path.display());
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ImageUpload::new(bytes, file_name))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
