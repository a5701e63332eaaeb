//! CLI application for receipt ingestion and categorization.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{categorize, config, documents, ingest, parse, rules, transactions, Context};

/// Receipt scanner - turn receipts into categorized transactions
#[derive(Parser)]
#[command(name = "finscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Email of the user records belong to
    #[arg(short, long, global = true, default_value = commands::DEFAULT_USER)]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and parse a single file without storing it
    Parse(parse::ParseArgs),

    /// Upload files and process them through the pipeline
    Ingest(ingest::IngestArgs),

    /// Inspect, reprocess, or delete uploaded documents
    Documents(documents::DocumentsArgs),

    /// List or export transactions
    Transactions(transactions::TransactionsArgs),

    /// Categorize transactions with rules and keywords
    Categorize(categorize::CategorizeArgs),

    /// Manage categorization rules
    Rules(rules::RulesArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let ctx = Context {
        config_path: cli.config,
        user_email: cli.user,
    };

    // Execute command
    match cli.command {
        Commands::Parse(args) => parse::run(args, &ctx).await,
        Commands::Ingest(args) => ingest::run(args, &ctx).await,
        Commands::Documents(args) => documents::run(args, &ctx).await,
        Commands::Transactions(args) => transactions::run(args, &ctx).await,
        Commands::Categorize(args) => categorize::run(args, &ctx).await,
        Commands::Rules(args) => rules::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
