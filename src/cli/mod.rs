use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::application::{ExpenseFilter, ExpenseService};
use crate::domain::{
    Cents, Expense, ExpenseDraft, checked_total, format_cents, parse_cents, parse_date,
};
use crate::logging;

/// Spendbook - Personal Expense Tracker
#[derive(Parser)]
#[command(name = "spendbook")]
#[command(about = "A local-first personal expense tracker")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(
        short,
        long,
        env = "SPENDBOOK_DB",
        default_value = "spendbook.db",
        global = true
    )]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log filter, e.g. "info" or "spendbook=debug" (overrides --verbose)
    #[arg(long, env = "SPENDBOOK_LOG", global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Add an expense (nothing is saved without a value)
    Add {
        /// Expense name
        name: String,

        /// Amount spent (e.g., "4.50" or "1200")
        #[arg(long)]
        value: Option<String>,

        /// Date of the expense (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List expenses, newest first
    List {
        /// Only expenses of at least this amount
        #[arg(long)]
        min_value: Option<String>,

        /// Only expenses of at most this amount
        #[arg(long)]
        max_value: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Only expenses whose name contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of expenses to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ListFormat::Table)]
        format: ListFormat,
    },

    /// Show a single expense
    Show {
        /// Expense ID
        id: String,
    },

    /// Edit fields of an expense
    Edit {
        /// Expense ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New amount
        #[arg(long)]
        value: Option<String>,
    },

    /// Delete one or more expenses by ID
    Delete {
        /// Expense IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Export all expenses
    Export {
        /// Output format
        #[arg(value_enum)]
        format: ExportFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import expenses from CSV (id,date,name,value)
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip rows already in the store (same ID, or same date, name and value)
        #[arg(long)]
        skip_duplicates: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let level = logging::resolve_level(self.log.as_deref(), self.verbose);
        if let Err(err) = logging::init_logging(level) {
            eprintln!("Warning: logging disabled: {}", err);
        }

        match self.command {
            Commands::Init => {
                ExpenseService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Add { name, value, date } => {
                let service = ExpenseService::connect(&self.database).await?;

                let mut draft = ExpenseDraft::new().with_name(name);
                if let Some(date_str) = date {
                    draft.set_date(parse_cli_date(&date_str)?);
                }
                if let Some(value_str) = value {
                    draft.set_value(parse_amount(&value_str)?);
                }

                match service.commit_draft(draft).await? {
                    Some(expense) => println!(
                        "Added expense: {} {} ({})",
                        display_name(&expense.name),
                        format_cents(expense.value),
                        expense.id
                    ),
                    None => eprintln!("Nothing saved: an expense needs a value (use --value)."),
                }
            }

            Commands::List {
                min_value,
                max_value,
                from_date,
                to_date,
                search,
                limit,
                format,
            } => {
                let service = ExpenseService::connect(&self.database).await?;
                let filter = ExpenseFilter {
                    min_value: min_value.as_deref().map(parse_amount).transpose()?,
                    max_value: max_value.as_deref().map(parse_amount).transpose()?,
                    from_date: from_date.as_deref().map(parse_cli_date).transpose()?,
                    to_date: to_date.as_deref().map(parse_cli_date).transpose()?,
                    name_contains: search,
                    limit,
                };
                run_list_command(&service, &filter, format).await?;
            }

            Commands::Show { id } => {
                let service = ExpenseService::connect(&self.database).await?;
                let expense = service.get(parse_id(&id)?).await?;
                print_expense(&expense);
            }

            Commands::Edit {
                id,
                name,
                date,
                value,
            } => {
                let service = ExpenseService::connect(&self.database).await?;
                let mut draft = service.edit(parse_id(&id)?).await?;

                if let Some(name) = name {
                    draft.set_name(name);
                }
                if let Some(date_str) = date {
                    draft.set_date(parse_cli_date(&date_str)?);
                }
                if let Some(value_str) = value {
                    draft.set_value(parse_amount(&value_str)?);
                }

                // A loaded draft always has a value, so this commits.
                if let Some(expense) = service.commit_draft(draft).await? {
                    println!("Updated expense:");
                    print_expense(&expense);
                }
            }

            Commands::Delete { ids } => {
                let service = ExpenseService::connect(&self.database).await?;
                let ids = ids
                    .iter()
                    .map(|s| parse_id(s))
                    .collect::<Result<Vec<_>>>()?;

                let removed = service.delete(&ids).await?;
                println!("Deleted {} of {} expense(s)", removed, ids.len());
                if removed < ids.len() {
                    eprintln!("Some IDs did not match any expense.");
                }
            }

            Commands::Export { format, output } => {
                let service = ExpenseService::connect(&self.database).await?;
                run_export_command(&service, format, output.as_deref()).await?;
            }

            Commands::Import {
                input,
                dry_run,
                skip_duplicates,
            } => {
                let service = ExpenseService::connect(&self.database).await?;
                run_import_command(&service, input.as_deref(), dry_run, skip_duplicates).await?;
            }
        }

        Ok(())
    }
}

async fn run_list_command(
    service: &ExpenseService,
    filter: &ExpenseFilter,
    format: ListFormat,
) -> Result<()> {
    let expenses = service.list_filtered(filter).await?;

    if format == ListFormat::Json {
        println!("{}", serde_json::to_string_pretty(&expenses)?);
        return Ok(());
    }

    print!("{}", render_table(&expenses));
    Ok(())
}

/// Lines shown when there is nothing to list.
pub const EMPTY_STATE: [&str; 2] = ["No Expenses", "Start adding expenses to see your list."];

/// Text table for `list`, or the empty-state placeholder.
pub fn render_table(expenses: &[Expense]) -> String {
    let mut out = String::new();

    if expenses.is_empty() {
        for line in EMPTY_STATE {
            out.push_str(line);
            out.push('\n');
        }
        return out;
    }

    let rule = "-".repeat(94);
    out.push_str(&format!(
        "{:<12} {:<30} {:>12}  ID\n",
        "DATE", "NAME", "VALUE"
    ));
    out.push_str(&rule);
    out.push('\n');
    for expense in expenses {
        out.push_str(&format!(
            "{:<12} {:<30} {:>12}  {}\n",
            expense.date.format("%Y-%m-%d"),
            truncate(display_name(&expense.name), 30),
            format_cents(expense.value),
            expense.id
        ));
    }
    out.push_str(&rule);
    out.push('\n');

    let total = checked_total(expenses.iter().map(|e| e.value))
        .map(format_cents)
        .unwrap_or_else(|| "overflow".to_string());
    out.push_str(&format!(
        "{:<12} {:<30} {:>12}\n",
        "",
        format!("{} expense(s)", expenses.len()),
        total
    ));
    out
}

async fn run_export_command(
    service: &ExpenseService,
    format: ExportFormat,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create file: {}", path))?,
        ),
        None => Box::new(stdout()),
    };

    let count = match format {
        ExportFormat::Csv => exporter.export_csv(writer).await?,
        ExportFormat::Json => exporter.export_json(writer).await?,
    };

    if let Some(path) = output {
        eprintln!("Exported {} expense(s) to {}", count, path);
    }
    Ok(())
}

async fn run_import_command(
    service: &ExpenseService,
    input: Option<&str>,
    dry_run: bool,
    skip_duplicates: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            Box::new(File::open(path).with_context(|| format!("Failed to open file: {}", path))?)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        skip_duplicates,
    };
    let result = Importer::new(service).import_csv(reader, options).await?;

    for error in &result.errors {
        eprintln!("Line {}: {}", error.line, error.error);
    }

    let verb = if dry_run { "Would import" } else { "Imported" };
    println!(
        "{} {} expense(s), skipped {}, {} error(s)",
        verb,
        result.imported,
        result.skipped,
        result.errors.len()
    );
    Ok(())
}

fn print_expense(expense: &Expense) {
    println!("Expense: {}", display_name(&expense.name));
    println!("  ID:       {}", expense.id);
    println!("  Date:     {}", expense.date.format("%Y-%m-%d"));
    println!("  Value:    {}", format_cents(expense.value));
    println!(
        "  Recorded: {}",
        expense.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if expense.updated_at != expense.created_at {
        println!(
            "  Updated:  {}",
            expense.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

fn display_name(name: &str) -> &str {
    if name.is_empty() { "(unnamed)" } else { name }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).with_context(|| format!("Invalid expense ID '{}' (expected UUID)", s))
}

fn parse_amount(s: &str) -> Result<Cents> {
    let cents = parse_cents(s).with_context(|| format!("Invalid amount '{}'. Use '4.50' or '12'", s))?;
    if cents < 0 {
        bail!("Amount must not be negative: {}", s);
    }
    Ok(cents)
}

fn parse_cli_date(s: &str) -> Result<DateTime<Utc>> {
    parse_date(s).with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Coffee", 10), "Coffee");
        assert_eq!(truncate("Monthly apartment rent", 10), "Monthly...");
    }

    #[test]
    fn test_parse_amount_rejects_negative() {
        assert_eq!(parse_amount("4.50").unwrap(), 450);
        assert!(parse_amount("-4.50").is_err());
        assert!(parse_amount("four").is_err());
    }

    #[test]
    fn test_cli_parses_add_without_value() {
        let cli = Cli::try_parse_from(["spendbook", "-d", "x.db", "add", "Lunch"]).unwrap();
        match cli.command {
            Commands::Add { name, value, date } => {
                assert_eq!(name, "Lunch");
                assert!(value.is_none());
                assert!(date.is_none());
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn test_database_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["spendbook", "list", "-d", "other.db"]).unwrap();
        assert_eq!(cli.database, "other.db");
        assert!(matches!(cli.command, Commands::List { .. }));
    }

    #[test]
    fn test_render_empty_state() {
        assert_eq!(
            render_table(&[]),
            "No Expenses\nStart adding expenses to see your list.\n"
        );
    }

    #[test]
    fn test_render_table_rows_and_total() {
        let date = parse_date("2024-05-02").unwrap();
        let rent = Expense::new("Rent", date, 120000);
        let coffee = Expense::new("", date, 450);

        let out = render_table(&[rent.clone(), coffee]);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("DATE"));
        assert!(lines[2].starts_with("2024-05-02   Rent"));
        assert!(lines[2].contains("1200.00"));
        assert!(lines[2].ends_with(&rent.id.to_string()));
        assert!(lines[3].contains("(unnamed)"));
        assert!(lines[5].contains("2 expense(s)"));
        assert!(lines[5].ends_with("1204.50"));
    }

    #[test]
    fn test_render_table_total_overflow() {
        let date = parse_date("2024-05-02").unwrap();
        let big = Expense::new("Big", date, i64::MAX);
        let out = render_table(&[big.clone(), big]);
        assert!(out.lines().last().unwrap().ends_with("overflow"));
    }

    #[test]
    fn test_cli_delete_requires_ids() {
        assert!(Cli::try_parse_from(["spendbook", "delete"]).is_err());
    }
}
