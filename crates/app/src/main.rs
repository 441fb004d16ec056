use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use pesa_core::{Money, DEFAULT_CASH_ACCOUNT, DEFAULT_CURRENCY, DEFAULT_OPENING_ACCOUNT};
use pesa_import::ConfigError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "pesa", version)]
#[command(about = "Categorize M-Pesa statements into ledger-cli journals")]
struct Cli {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a ledger journal for an extracted statement.
    Ledger(LedgerArgs),
    /// Validate a rules file and list its rules.
    Check(ConfigArgs),
    /// Show which rule a description and amount resolve to.
    Explain(ExplainArgs),
}

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Rules file, JSON or TOML by extension. Defaults to the rules file in
    /// the user data directory (also read from `PESA_CONFIG`).
    #[arg(short, long, env = "PESA_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LedgerArgs {
    /// Statement as CSV or a JSON array of rows.
    pub input: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Journal to write. Defaults to the input path with a `.dat` extension.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// First date to include (YYYY-MM-DD). Defaults to January 1 of this year.
    #[arg(short = 's', long = "start-date")]
    pub start: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD).
    #[arg(short = 'e', long = "end-date")]
    pub end: Option<NaiveDate>,

    #[arg(long, default_value = DEFAULT_CASH_ACCOUNT)]
    pub cash_account: String,

    /// Account the opening balance is balanced against.
    #[arg(long, default_value = DEFAULT_OPENING_ACCOUNT)]
    pub opening_account: String,

    #[arg(long, default_value = DEFAULT_CURRENCY)]
    pub currency: String,

    /// Start the journal with `account` directives.
    #[arg(long)]
    pub declare_accounts: bool,
}

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Transaction description as it appears on the statement.
    pub description: String,

    /// Signed amount; positive is money out.
    #[arg(short, long, allow_negative_numbers = true)]
    pub amount: Money,

    #[command(flatten)]
    pub config: ConfigArgs,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "pesa={level},pesa_core={level},pesa_import={level},pesa_ledger={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let today = chrono::Local::now().date_naive();
    let result = match cli.command {
        Command::Ledger(args) => commands::ledger(args, today),
        Command::Check(args) => commands::check(args),
        Command::Explain(args) => commands::explain(args, today),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.downcast_ref::<ConfigError>().is_some() {
                eprintln!("Configuration error: {err:#}");
            } else {
                eprintln!("Error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
