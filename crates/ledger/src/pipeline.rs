use chrono::NaiveDate;
use pesa_core::{DateWindow, Money, Transaction};
use pesa_import::CategoryRuleEngine;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use crate::balance::BalanceTracker;
use crate::entry::{LedgerEntry, LedgerError};
use crate::format::LedgerFormatter;

/// What a ledger run wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub transactions: usize,
    /// Transactions no rule matched.
    pub uncategorized: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub account_totals: BTreeMap<String, Money>,
    /// Cash balance before the first transaction written.
    pub opening_balance: Option<Money>,
    pub closing_balance: Option<Money>,
}

impl RunSummary {
    pub fn is_empty(&self) -> bool {
        self.transactions == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => write!(
                f,
                "Processed {} transactions from {} to {}",
                self.transactions, first, last
            ),
            _ => write!(f, "Processed 0 transactions"),
        }
    }
}

/// Filters, categorizes, tracks and writes `transactions` in one pass.
///
/// Rows dated before the window only seed the running balance. When the
/// opening balance is non-zero an `Opening balance` entry precedes the
/// first transaction, so every balance assertion holds against the
/// postings. Entries are held back only until that balance is known.
///
/// Nothing is written when the window holds no transactions, not even the
/// account header.
pub fn write_ledger<I, W>(
    transactions: I,
    engine: &CategoryRuleEngine,
    window: DateWindow,
    formatter: &LedgerFormatter,
    writer: &mut W,
) -> Result<RunSummary, LedgerError>
where
    I: IntoIterator<Item = Transaction>,
    W: Write,
{
    let mut rows = transactions.into_iter().peekable();
    let mut tracker = BalanceTracker::new();
    let mut primed = 0usize;
    while let Some(tx) = rows.next_if(|tx| tx.date < window.start()) {
        tracker.prime(&tx);
        primed += 1;
    }

    let categorized = window.filter(rows).map(|tx| engine.resolve(tx));
    let mut tracked = tracker.track(categorized);
    let mut summary = RunSummary::default();
    let mut pending: Vec<LedgerEntry> = Vec::new();
    let mut opened = false;

    while let Some(item) = tracked.next() {
        let entry = formatter.entry_for(&item)?;
        if summary.first_date.is_none() && formatter.options().declare_accounts {
            formatter.write_header(writer, engine.accounts())?;
        }
        summary.first_date.get_or_insert(entry.date);
        summary.last_date = Some(entry.date);

        if opened {
            formatter.write_entry(writer, &entry)?;
            continue;
        }
        pending.push(entry);
        if let (Some(opening), Some(first)) = (tracked.tracker().opening_balance(), summary.first_date) {
            if !opening.is_zero() {
                formatter.write_entry(writer, &formatter.opening_entry(first, opening)?)?;
            }
            for entry in pending.drain(..) {
                formatter.write_entry(writer, &entry)?;
            }
            opened = true;
        }
    }
    // No balance anywhere in the window: no assertions to satisfy.
    for entry in pending.drain(..) {
        formatter.write_entry(writer, &entry)?;
    }
    writer.flush()?;

    let tracker = tracked.into_tracker();
    summary.transactions = tracker.count();
    summary.uncategorized = tracker.default_count();
    summary.opening_balance = tracker.opening_balance();
    summary.closing_balance = tracker.closing_balance();
    summary.account_totals = tracker.account_totals().clone();

    tracing::info!(
        window = %window,
        transactions = summary.transactions,
        uncategorized = summary.uncategorized,
        before_window = primed,
        "ledger written"
    );
    Ok(summary)
}
