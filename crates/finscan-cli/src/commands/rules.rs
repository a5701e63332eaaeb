//! Rules command - manage categorization rules.

use clap::{Args, Subcommand};
use console::style;

use finscan_core::{NewRule, RuleField, Store};

use super::Context;

/// Arguments for the rules command.
#[derive(Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    command: RulesCommand,
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Add a rule
    Add(AddArgs),

    /// List rules, highest priority first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Enable a rule
    Enable {
        /// Rule id
        id: i64,
    },

    /// Disable a rule
    Disable {
        /// Rule id
        id: i64,
    },
}

#[derive(Args)]
struct AddArgs {
    /// Pattern (regex, or plain text if it is not a valid regex)
    #[arg(short, long)]
    pattern: String,

    /// Category name or id
    #[arg(long)]
    category: String,

    /// Rule name (default: the pattern)
    #[arg(short, long)]
    name: Option<String>,

    /// Field the pattern is matched against
    #[arg(short, long, default_value = "merchant")]
    field: String,

    /// Higher priorities are tried first
    #[arg(long, default_value = "0")]
    priority: i64,
}

pub async fn run(args: RulesArgs, ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;
    let user = ctx.current_user(&store)?;

    match args.command {
        RulesCommand::Add(add) => {
            let category_id = resolve_category(&store, &add.category)?;
            let rule = store.create_rule(&NewRule {
                user_id: user.id,
                category_id,
                name: add.name.unwrap_or_else(|| add.pattern.clone()),
                pattern: add.pattern,
                field: RuleField::parse(&add.field.to_lowercase()),
                priority: add.priority,
                is_active: true,
            })?;
            println!(
                "{} Added rule {} ({} ~ {:?} -> category {})",
                style("✓").green(),
                rule.id,
                rule.field,
                rule.pattern,
                rule.category_id
            );
        }
        RulesCommand::List { json } => {
            let mut rules = store.list_rules(user.id)?;
            rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

            if json {
                println!("{}", serde_json::to_string_pretty(&rules)?);
            } else if rules.is_empty() {
                println!("{} No rules defined.", style("ℹ").blue());
            } else {
                for rule in &rules {
                    let state = if rule.is_active {
                        style("active").green()
                    } else {
                        style("disabled").dim()
                    };
                    println!(
                        "{:>4}  [{:>4}]  {}  {} ~ {:?} -> {}  ({})",
                        rule.id, rule.priority, rule.name, rule.field, rule.pattern, rule.category_id, state
                    );
                }
            }
        }
        RulesCommand::Enable { id } => {
            store.set_rule_active(user.id, id, true)?;
            println!("{} Enabled rule {}", style("✓").green(), id);
        }
        RulesCommand::Disable { id } => {
            store.set_rule_active(user.id, id, false)?;
            println!("{} Disabled rule {}", style("✓").green(), id);
        }
    }

    Ok(())
}

/// Accept a numeric id or a (partial) category name.
fn resolve_category(store: &Store, category: &str) -> anyhow::Result<i64> {
    if let Ok(id) = category.parse::<i64>() {
        if store.list_categories()?.iter().any(|c| c.id == id) {
            return Ok(id);
        }
        anyhow::bail!("No category with id {}", id);
    }

    let categories = store.list_categories()?;
    if let Some(exact) = categories.iter().find(|c| c.name.eq_ignore_ascii_case(category)) {
        return Ok(exact.id);
    }
    match store.find_category_by_name_fragment(category)? {
        Some(found) => Ok(found.id),
        None => anyhow::bail!("No category named like {:?}", category),
    }
}
