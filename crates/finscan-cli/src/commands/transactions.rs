//! Transactions command - list or export transactions.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use finscan_core::Transaction;

use super::{Context, OutputFormat};

/// Arguments for the transactions command.
#[derive(Args)]
pub struct TransactionsArgs {
    #[command(subcommand)]
    command: TransactionsCommand,
}

#[derive(Subcommand)]
enum TransactionsCommand {
    /// List transactions
    List {
        /// Only transactions without a category
        #[arg(long)]
        uncategorized: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub async fn run(args: TransactionsArgs, ctx: &Context) -> anyhow::Result<()> {
    match args.command {
        TransactionsCommand::List {
            uncategorized,
            format,
            output,
        } => list_transactions(ctx, uncategorized, format, output),
    }
}

fn list_transactions(
    ctx: &Context,
    uncategorized: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;
    let user = ctx.current_user(&store)?;

    let transactions = store.list_transactions(user.id, uncategorized)?;
    let categories: HashMap<i64, String> = store
        .list_categories()?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&transactions)?,
        OutputFormat::Csv => format_transactions_csv(&transactions, &categories)?,
        OutputFormat::Text => format_transactions_text(&transactions, &categories),
    };

    if let Some(output_path) = output {
        fs::write(&output_path, content)?;
        println!(
            "{} Wrote {} transactions to {}",
            style("✓").green(),
            transactions.len(),
            output_path.display()
        );
    } else {
        print!("{}", content);
    }

    Ok(())
}

fn category_name(categories: &HashMap<i64, String>, id: Option<i64>) -> String {
    id.and_then(|id| categories.get(&id).cloned()).unwrap_or_default()
}

fn format_transactions_csv(
    transactions: &[Transaction],
    categories: &HashMap<i64, String>,
) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "id",
        "date",
        "merchant",
        "amount",
        "currency",
        "tax",
        "category",
        "document_id",
    ])?;

    for tx in transactions {
        wtr.write_record([
            tx.id.to_string(),
            tx.date.to_string(),
            tx.merchant.clone().unwrap_or_default(),
            tx.amount.to_string(),
            tx.currency.clone(),
            tx.tax.map(|t| t.to_string()).unwrap_or_default(),
            category_name(categories, tx.category_id),
            tx.document_id.map(|d| d.to_string()).unwrap_or_default(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_transactions_text(transactions: &[Transaction], categories: &HashMap<i64, String>) -> String {
    if transactions.is_empty() {
        return "No transactions.\n".to_string();
    }

    let mut output = String::new();
    for tx in transactions {
        let category = category_name(categories, tx.category_id);
        output.push_str(&format!(
            "{:>5}  {}  {:>10} {}  {:<30}  {}\n",
            tx.id,
            tx.date,
            tx.amount,
            tx.currency,
            tx.merchant.as_deref().unwrap_or("-"),
            if category.is_empty() { "uncategorized" } else { &category }
        ));
    }
    output
}
