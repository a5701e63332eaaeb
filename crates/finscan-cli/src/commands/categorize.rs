//! Categorize command - assign categories to stored transactions.

use clap::{Args, Subcommand};
use console::style;

use finscan_core::bulk_categorize;

use super::Context;

/// Arguments for the categorize command.
#[derive(Args)]
pub struct CategorizeArgs {
    #[command(subcommand)]
    command: CategorizeCommand,
}

#[derive(Subcommand)]
enum CategorizeCommand {
    /// Run rules and keyword matching over transactions
    Run {
        /// Re-categorize transactions that already have a category
        #[arg(long)]
        all: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available categories
    Categories,
}

pub async fn run(args: CategorizeArgs, ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;

    match args.command {
        CategorizeCommand::Run { all, json } => {
            let user = ctx.current_user(&store)?;
            let outcome = bulk_categorize(&store, user.id, !all)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!(
                    "{} Categorized {} of {} transactions",
                    style("✓").green(),
                    outcome.categorized,
                    outcome.considered
                );
            }
        }
        CategorizeCommand::Categories => {
            let categories = store.list_categories()?;
            for category in categories.iter().filter(|c| c.parent_id.is_none()) {
                println!("{:>4}  {}", category.id, style(&category.name).bold());
                for child in categories.iter().filter(|c| c.parent_id == Some(category.id)) {
                    println!("{:>4}    {}", child.id, child.name);
                }
            }
        }
    }

    Ok(())
}
