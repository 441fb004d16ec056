use anyhow::{Context, Result};
use chrono::NaiveDate;
use pesa_core::{validate_account_name, AccountType, DateWindow, Money, Transaction};
use pesa_import::{read_statement, CategoryRuleEngine, Rule};
use pesa_ledger::{write_ledger, FormatOptions, LedgerFormatter};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;

use crate::settings;
use crate::{ConfigArgs, ExplainArgs, LedgerArgs};

pub fn ledger(args: LedgerArgs, today: NaiveDate) -> Result<()> {
    let window = DateWindow::from_options(args.start, args.end, today)?;
    validate_account_name(&args.cash_account)
        .with_context(|| format!("invalid cash account '{}'", args.cash_account))?;
    validate_account_name(&args.opening_account)
        .with_context(|| format!("invalid opening account '{}'", args.opening_account))?;

    let config_path = settings::resolve_config_path(args.config.config)?;
    let engine = settings::load_engine(&config_path)?;

    let file = File::open(&args.input)
        .with_context(|| format!("opening statement {}", args.input.display()))?;
    let transactions = read_statement(BufReader::new(file))
        .with_context(|| format!("reading statement {}", args.input.display()))?;
    tracing::debug!("Read {} transactions from {}", transactions.len(), args.input.display());

    let formatter = LedgerFormatter::new(FormatOptions {
        cash_account: args.cash_account,
        opening_account: args.opening_account,
        currency: args.currency,
        declare_accounts: args.declare_accounts,
        ..FormatOptions::default()
    });

    // Buffered so an empty window leaves no file behind.
    let mut journal = Vec::new();
    let summary = write_ledger(transactions, &engine, window, &formatter, &mut journal)?;
    if summary.is_empty() {
        println!("No transactions found in the date range: {window}");
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| settings::default_output_path(&args.input));
    fs::write(&output, journal).with_context(|| format!("writing {}", output.display()))?;

    println!("Generated ledger file: {}", output.display());
    println!("{summary}");
    for (kind, total) in totals_by_type(&summary.account_totals) {
        println!("  {kind}: {total}");
    }
    if summary.uncategorized > 0 {
        println!(
            "{} transactions fell through to {}",
            summary.uncategorized,
            engine.default_account()
        );
    }
    Ok(())
}

pub fn check(args: ConfigArgs) -> Result<()> {
    let config_path = settings::resolve_config_path(args.config)?;
    let engine = settings::load_engine(&config_path)?;

    println!(
        "{}: {} accounts, {} rules",
        config_path.display(),
        engine.accounts().len(),
        engine.rules().len()
    );
    for rule in engine.rules() {
        println!("  {}", describe_rule(rule));
    }
    println!("  default -> {}", engine.default_account());

    for account in unclassified_accounts(&engine) {
        tracing::warn!("{account} has no Assets, Liabilities, Equity, Income or Expenses root");
        println!("  warning: {account} is not under a standard root");
    }
    Ok(())
}

pub fn explain(args: ExplainArgs, today: NaiveDate) -> Result<()> {
    let config_path = settings::resolve_config_path(args.config.config)?;
    let engine = settings::load_engine(&config_path)?;

    let tx = Transaction::new(today, args.description, args.amount);
    match engine.find_matching_rule(&tx) {
        Some(rule) => println!("{}", describe_rule(rule)),
        None => println!("no rule matched -> {}", engine.default_account()),
    }
    Ok(())
}

/// Sums account totals by account type. Accounts with an unknown root are
/// left out.
fn totals_by_type(totals: &BTreeMap<String, Money>) -> BTreeMap<AccountType, Money> {
    let mut by_type = BTreeMap::new();
    for (account, total) in totals {
        if let Some(kind) = AccountType::of(account) {
            *by_type.entry(kind).or_insert_with(Money::zero) += *total;
        }
    }
    by_type
}

/// Rule and default accounts, in rule order, that `AccountType` cannot
/// classify.
fn unclassified_accounts(engine: &CategoryRuleEngine) -> Vec<&str> {
    let mut accounts: Vec<&str> = Vec::new();
    let candidates = engine
        .rules()
        .iter()
        .map(|rule| rule.account())
        .chain(std::iter::once(engine.default_account()));
    for account in candidates {
        if AccountType::of(account).is_none() && !accounts.contains(&account) {
            accounts.push(account);
        }
    }
    accounts
}

/// One-line summary, e.g. `[2] any(uber, taxi) unless(free) if amount > 0 -> Expenses:Transport`.
fn describe_rule(rule: &Rule) -> String {
    let mut line = format!(
        "[{}] {}({})",
        rule.position(),
        rule.match_type(),
        rule.keywords().join(", ")
    );
    if !rule.exclude().is_empty() {
        line.push_str(&format!(" unless({})", rule.exclude().join(", ")));
    }
    if let Some(condition) = rule.condition() {
        line.push_str(&format!(" if {condition}"));
    }
    line.push_str(&format!(" -> {}", rule.account()));
    line
}
