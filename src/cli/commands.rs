//! CLI command implementations: `submit`, `status`, `cancel`, `export`,
//! `serve`. Progress display uses `indicatif`/`console`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::export::{export_batch, ExportFormat};
use crate::models::DocumentType;
use crate::scheduler::SubmissionFile;
use crate::server::{self, AppState};

#[derive(Parser)]
#[command(name = "fakturflow")]
#[command(about = "Ingestion and extraction pipeline for scanned Indonesian tax and financial documents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a batch of files under one declared document type
    Submit {
        /// Owner identity the batch is submitted under
        #[arg(long)]
        owner: String,
        /// Declared document type (faktur_pajak, pph21, pph23, invoice, rekening_koran)
        #[arg(long)]
        document_type: String,
        /// Files to submit
        files: Vec<PathBuf>,
    },
    /// Show a batch's current status
    Status {
        batch_id: String,
    },
    /// Request cancellation of an in-flight batch
    Cancel {
        batch_id: String,
    },
    /// Export a batch's results to a file
    Export {
        batch_id: String,
        #[arg(long, default_value = "xlsx")]
        format: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Run the demo HTTP/WebSocket server
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

pub async fn run(cli: Cli, state: AppState) -> Result<()> {
    match cli.command {
        Commands::Submit { owner, document_type, files } => cmd_submit(state, owner, document_type, files).await,
        Commands::Status { batch_id } => cmd_status(state, batch_id).await,
        Commands::Cancel { batch_id } => cmd_cancel(state, batch_id).await,
        Commands::Export { batch_id, format, out } => cmd_export(state, batch_id, format, out).await,
        Commands::Serve { host, port } => server::serve(state, &host, port).await,
    }
}

async fn cmd_submit(state: AppState, owner: String, document_type: String, paths: Vec<PathBuf>) -> Result<()> {
    let declared_type = DocumentType::from_str(&document_type)
        .with_context(|| format!("unknown document type {document_type}"))?;
    if paths.is_empty() {
        bail!("at least one file is required");
    }

    let progress = ProgressBar::new(paths.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} reading files")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(SubmissionFile { filename, declared_type, bytes });
        progress.inc(1);
    }
    progress.finish_and_clear();

    let batch = state.scheduler.submit(&owner, files).await?;
    println!("{} batch {}", style("submitted").green().bold(), batch.id);
    Ok(())
}

async fn cmd_status(state: AppState, batch_id: String) -> Result<()> {
    match state.scheduler.status(&batch_id).await? {
        Some(batch) => {
            println!(
                "{} status={} processed={} failed={}/{}",
                batch.id, batch.status, batch.files_processed, batch.files_failed, batch.total_files
            );
        }
        None => bail!("no such batch: {batch_id}"),
    }
    Ok(())
}

async fn cmd_cancel(state: AppState, batch_id: String) -> Result<()> {
    state.scheduler.cancel(&batch_id).await?;
    println!("{} batch {}", style("cancel requested for").yellow(), batch_id);
    Ok(())
}

async fn cmd_export(state: AppState, batch_id: String, format: String, out: PathBuf) -> Result<()> {
    let format = match format.as_str() {
        "xlsx" => ExportFormat::Xlsx,
        "html" => ExportFormat::Html,
        other => bail!("unknown export format {other}, expected xlsx or html"),
    };
    let results = state.scheduler.results(&batch_id).await?;
    let bytes = export_batch(&results, format)?;
    std::fs::write(&out, bytes).with_context(|| format!("failed to write {}", out.display()))?;
    println!("{} {}", style("wrote").green().bold(), out.display());
    Ok(())
}
