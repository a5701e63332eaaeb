//! Documents command - inspect and manage uploaded documents.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use console::style;

use finscan_core::extract::TextExtractor;
use finscan_core::ingest::{reconcile_stale, Pipeline};
use finscan_core::{DocumentStatus, UploadedDocument};

use super::{Context, OutputFormat};

/// Arguments for the documents command.
#[derive(Args)]
pub struct DocumentsArgs {
    #[command(subcommand)]
    command: DocumentsCommand,
}

#[derive(Subcommand)]
enum DocumentsCommand {
    /// List documents and their processing status
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one document, including extracted text and data
    Show {
        /// Document id
        id: i64,
    },

    /// Queue a document for processing again
    Reprocess {
        /// Document id
        id: i64,

        /// Queue only; do not wait for processing
        #[arg(long)]
        no_wait: bool,
    },

    /// Delete a document and its stored file
    Delete {
        /// Document id
        id: i64,
    },

    /// Fail documents left in processing by an interrupted run
    Reconcile,
}

pub async fn run(args: DocumentsArgs, ctx: &Context) -> anyhow::Result<()> {
    match args.command {
        DocumentsCommand::List { format } => list_documents(ctx, format),
        DocumentsCommand::Show { id } => show_document(ctx, id),
        DocumentsCommand::Reprocess { id, no_wait } => reprocess_document(ctx, id, no_wait).await,
        DocumentsCommand::Delete { id } => delete_document(ctx, id).await,
        DocumentsCommand::Reconcile => reconcile(ctx),
    }
}

fn list_documents(ctx: &Context, format: OutputFormat) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;
    let user = ctx.current_user(&store)?;
    let documents = store.list_documents(user.id)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&documents)?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(["id", "filename", "mime_type", "status", "created_at", "error"])?;
            for doc in &documents {
                wtr.write_record([
                    doc.id.to_string(),
                    doc.filename.clone(),
                    doc.mime_type.clone(),
                    doc.status.to_string(),
                    doc.created_at.to_rfc3339(),
                    doc.error_message.clone().unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        OutputFormat::Text => {
            if documents.is_empty() {
                println!("{} No documents yet.", style("ℹ").blue());
            }
            for doc in &documents {
                println!(
                    "{:>5}  {:<10}  {}  {}",
                    doc.id,
                    styled_status(doc.status),
                    doc.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                    doc.filename
                );
                if let Some(error) = &doc.error_message {
                    println!("       {}", style(error).red());
                }
            }
        }
    }

    Ok(())
}

fn show_document(ctx: &Context, id: i64) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;
    let user = ctx.current_user(&store)?;

    let Some(doc) = store.get_document_for_user(user.id, id)? else {
        anyhow::bail!("Document {} not found", id);
    };

    print_document(&doc);

    if let Some(tx) = store.find_transaction_by_document(doc.id)? {
        println!();
        println!(
            "Transaction {}: {} {} on {} at {}",
            tx.id,
            tx.amount,
            tx.currency,
            tx.date,
            tx.merchant.as_deref().unwrap_or("unknown merchant")
        );
        for item in store.list_line_items(tx.id)? {
            println!("  {} x {} = {}", item.name, item.quantity, item.total_price);
        }
    }

    Ok(())
}

fn print_document(doc: &UploadedDocument) {
    println!("Document {} ({})", doc.id, doc.filename);
    println!("  Status:   {}", styled_status(doc.status));
    println!("  Type:     {} ({} bytes)", doc.mime_type, doc.file_size);
    println!("  Stored:   {}", doc.file_path.display());
    if let Some(processed_at) = doc.processed_at {
        println!("  Processed {}", processed_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(error) = &doc.error_message {
        println!("  Error:    {}", style(error).red());
    }
    if let Some(text) = &doc.raw_text {
        println!();
        println!("{}", style("Extracted text:").bold());
        println!("{}", text);
    }
    if let Some(data) = &doc.extracted_data {
        println!();
        println!("{}", style("Extracted data:").bold());
        println!("{}", data);
    }
}

async fn reprocess_document(ctx: &Context, id: i64, no_wait: bool) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;
    let user = ctx.current_user(&store)?;

    let extractor = Arc::new(TextExtractor::from_config(&config.ocr));
    let pipeline = Pipeline::start(store.clone(), extractor, &config);
    let result = pipeline.ingestor.reprocess(user.id, id);
    if result.is_ok() && !no_wait {
        pipeline.drain().await;
    }
    pipeline.shutdown().await;
    result?;

    let Some(doc) = store.get_document(id)? else {
        anyhow::bail!("Document {} disappeared while processing", id);
    };
    println!(
        "{} Document {} is {}",
        style("✓").green(),
        doc.id,
        styled_status(doc.status)
    );
    if let Some(error) = &doc.error_message {
        println!("  {}", style(error).red());
    }

    Ok(())
}

async fn delete_document(ctx: &Context, id: i64) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;
    let user = ctx.current_user(&store)?;

    let extractor = Arc::new(TextExtractor::from_config(&config.ocr));
    let pipeline = Pipeline::start(store, extractor, &config);
    let result = pipeline.ingestor.delete_document(user.id, id);
    pipeline.shutdown().await;
    result?;

    println!("{} Deleted document {}", style("✓").green(), id);
    Ok(())
}

fn reconcile(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;

    let failed = reconcile_stale(&store, Duration::from_secs(config.pipeline.stale_after_secs))?;
    println!(
        "{} Marked {} abandoned documents as failed",
        style("✓").green(),
        failed.len()
    );
    Ok(())
}

fn styled_status(status: DocumentStatus) -> console::StyledObject<&'static str> {
    let text = status.as_str();
    match status {
        DocumentStatus::Processed => style(text).green(),
        DocumentStatus::Failed => style(text).red(),
        DocumentStatus::Processing | DocumentStatus::Queued => style(text).yellow(),
        DocumentStatus::Uploaded => style(text).dim(),
    }
}
