//! Parse command - extract fields from a single file without storing anything.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use finscan_core::extract::{TextExtraction, TextExtractor};
use finscan_core::models::config::OcrConfig;
use finscan_core::{ParsedFields, ReceiptParser};

use super::{mime_for_path, Context, OutputFormat};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Input file (PDF, JPEG, PNG, or plain text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Declared MIME type (default: guessed from the extension)
    #[arg(long)]
    mime: Option<String>,

    /// Print the extracted raw text before the parsed fields
    #[arg(long)]
    show_text: bool,
}

pub async fn run(args: ParseArgs, ctx: &Context) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = ctx.load_config()?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let raw_text = if is_plain_text(&args) {
        fs::read_to_string(&args.input)?
    } else {
        extract_text(&args, &config.ocr)?
    };

    let parsed = ReceiptParser::from_config(&config.parser).parse(&raw_text);

    if args.show_text {
        eprintln!("{}", style("Extracted text:").bold());
        eprintln!("{}", raw_text.trim());
        eprintln!();
    }

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&parsed)?,
        OutputFormat::Csv => format_parsed_csv(&parsed)?,
        OutputFormat::Text => format_parsed_text(&parsed),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

fn is_plain_text(args: &ParseArgs) -> bool {
    match &args.mime {
        Some(mime) => mime.starts_with("text/"),
        None => args
            .input
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt")),
    }
}

fn extract_text(args: &ParseArgs, ocr: &OcrConfig) -> anyhow::Result<String> {
    let mime = match &args.mime {
        Some(mime) => mime.clone(),
        None => mime_for_path(&args.input)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Cannot tell the file type of {}; pass --mime",
                    args.input.display()
                )
            })?
            .to_string(),
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Extracting text from {}...", args.input.display()));

    let result = TextExtractor::from_config(ocr).extract(&args.input, &mime);
    pb.finish_and_clear();

    let result = result?;
    info!(
        "Extracted {} pages with {} (confidence {:?})",
        result.page_count, result.method, result.confidence
    );

    if result.is_empty() {
        anyhow::bail!("No text could be extracted from {}", args.input.display());
    }
    Ok(result.raw_text)
}

fn format_parsed_csv(parsed: &ParsedFields) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["date", "amount", "merchant", "currency", "tax", "line_items"])?;
    wtr.write_record([
        parsed.date.map(|d| d.to_string()).unwrap_or_default(),
        parsed.amount.map(|a| a.to_string()).unwrap_or_default(),
        parsed.merchant.clone().unwrap_or_default(),
        parsed.currency.clone(),
        parsed.tax.map(|t| t.to_string()).unwrap_or_default(),
        parsed.line_items.len().to_string(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_parsed_text(parsed: &ParsedFields) -> String {
    let mut output = String::new();
    let missing = || "-".to_string();

    output.push_str(&format!(
        "Merchant: {}\n",
        parsed.merchant.clone().unwrap_or_else(missing)
    ));
    output.push_str(&format!(
        "Date:     {}\n",
        parsed.date.map(|d| d.to_string()).unwrap_or_else(missing)
    ));
    output.push_str(&format!(
        "Total:    {} {}\n",
        parsed.amount.map(|a| a.to_string()).unwrap_or_else(missing),
        parsed.currency
    ));
    if let Some(tax) = parsed.tax {
        output.push_str(&format!("Tax:      {} {}\n", tax, parsed.currency));
    }

    if !parsed.line_items.is_empty() {
        output.push_str("\nItems:\n");
        for item in &parsed.line_items {
            output.push_str(&format!(
                "  {} x {} @ {} = {}\n",
                item.name, item.quantity, item.unit_price, item.total_price
            ));
        }
    }

    output
}
