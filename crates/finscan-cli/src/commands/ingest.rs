//! Ingest command - upload files and run them through the pipeline.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use finscan_core::extract::TextExtractor;
use finscan_core::ingest::{reconcile_stale, DocumentEvent, Pipeline, UploadRequest};
use finscan_core::{DocumentStatus, UploadedDocument};

use super::{mime_for_path, Context};

/// Arguments for the ingest command.
#[derive(Args)]
pub struct IngestArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Number of parallel workers (default: from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Upload and queue only; do not wait for processing
    #[arg(long)]
    no_wait: bool,
}

pub async fn run(args: IngestArgs, ctx: &Context) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = ctx.load_config()?;
    if let Some(jobs) = args.jobs {
        config.pipeline.workers = jobs;
    }

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to ingest",
        style("ℹ").blue(),
        files.len()
    );

    let store = ctx.open_store(&config)?;
    let user = ctx.current_user(&store)?;

    let abandoned = reconcile_stale(&store, Duration::from_secs(config.pipeline.stale_after_secs))?;
    if !abandoned.is_empty() {
        warn!("Marked {} abandoned documents as failed", abandoned.len());
    }

    let extractor = Arc::new(TextExtractor::from_config(&config.ocr));
    let pipeline = Pipeline::start(store.clone(), extractor, &config);
    let mut events = pipeline.events.subscribe(user.id);

    let mut uploaded = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();
    for path in &files {
        let request = UploadRequest {
            user_id: user.id,
            filename: path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("document")
                .to_string(),
            mime_type: mime_for_path(path)
                .unwrap_or("application/octet-stream")
                .to_string(),
            bytes: fs::read(path)?,
        };

        match pipeline.ingestor.upload(request) {
            Ok(document) => {
                info!("Uploaded {} as document {}", path.display(), document.id);
                uploaded.push(document.id);
            }
            Err(e) => {
                warn!("Rejected {}: {}", path.display(), e);
                rejected.push((path.clone(), e.to_string()));
            }
        }
    }

    if !args.no_wait {
        let pb = ProgressBar::new(uploaded.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} processed {msg}",
                )?
                .progress_chars("=>-"),
        );

        let drained = pipeline.drain();
        tokio::pin!(drained);
        loop {
            tokio::select! {
                _ = &mut drained => break,
                event = events.recv() => match event {
                    Ok(DocumentEvent::DocumentProcessingCompleted { .. }) => pb.inc(1),
                    Ok(DocumentEvent::DocumentProcessingFailed { document_id, attempt, .. }) => {
                        pb.set_message(format!("(document {} failed attempt {})", document_id, attempt + 1));
                    }
                    _ => {}
                },
            }
        }
        pb.finish_with_message("Complete");
    }

    pipeline.shutdown().await;

    let documents: Vec<UploadedDocument> = uploaded
        .iter()
        .filter_map(|id| store.get_document(*id).transpose())
        .collect::<Result<_, _>>()?;

    println!();
    println!(
        "{} Ingested {} files in {:?}",
        style("✓").green(),
        files.len(),
        start.elapsed()
    );
    print_summary(&documents, &rejected);

    Ok(())
}

fn print_summary(documents: &[UploadedDocument], rejected: &[(PathBuf, String)]) {
    let count = |status: DocumentStatus| documents.iter().filter(|d| d.status == status).count();
    let processed = count(DocumentStatus::Processed);
    let failed = count(DocumentStatus::Failed);

    println!(
        "   {} processed, {} failed, {} pending, {} rejected",
        style(processed).green(),
        style(failed).red(),
        style(documents.len() - processed - failed).yellow(),
        style(rejected.len()).red()
    );

    let failed_docs: Vec<_> = documents
        .iter()
        .filter(|d| d.status == DocumentStatus::Failed)
        .collect();
    if !failed_docs.is_empty() || !rejected.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for doc in failed_docs {
            println!(
                "  - {} (document {}): {}",
                doc.filename,
                doc.id,
                doc.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        for (path, error) in rejected {
            println!("  - {}: {}", path.display(), error);
        }
    }
}
