use chrono::NaiveDate;
use pesa_core::{Money, DEFAULT_CASH_ACCOUNT, DEFAULT_CURRENCY, DEFAULT_OPENING_ACCOUNT};
use std::io::Write;

use crate::balance::TrackedTransaction;
use crate::entry::{LedgerEntry, LedgerError, Posting};

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Account every transaction balances against.
    pub cash_account: String,
    /// Counter-account of the opening balance entry.
    pub opening_account: String,
    pub currency: String,
    pub account_width: usize,
    pub amount_width: usize,
    /// Emit `; Receipt:` and `; Time:` comment lines.
    pub metadata: bool,
    /// Start the journal with `account` directives.
    pub declare_accounts: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            cash_account: DEFAULT_CASH_ACCOUNT.to_string(),
            opening_account: DEFAULT_OPENING_ACCOUNT.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            account_width: 45,
            amount_width: 15,
            metadata: true,
            declare_accounts: false,
        }
    }
}

/// Renders entries as ledger-cli journal text. Output depends only on the
/// entry and the options.
#[derive(Debug, Clone, Default)]
pub struct LedgerFormatter {
    options: FormatOptions,
}

impl LedgerFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    /// Builds the balanced entry for a tracked transaction. The cash
    /// posting carries the day's closing balance when it is the last
    /// transaction of its date.
    pub fn entry_for(&self, tracked: &TrackedTransaction) -> Result<LedgerEntry, LedgerError> {
        let mut entry = LedgerEntry::from_categorized(&tracked.transaction, &self.options.cash_account);
        if let Some(balance) = tracked.day_close_balance() {
            entry.assert_balance(&self.options.cash_account, balance);
        }
        entry.validate()
    }

    /// Entry that sets the cash account to `balance` before the first
    /// transaction, asserting the result.
    pub fn opening_entry(&self, date: NaiveDate, balance: Money) -> Result<LedgerEntry, LedgerError> {
        let cash = &self.options.cash_account;
        let mut entry = LedgerEntry::opening(date, balance, cash, &self.options.opening_account);
        entry.assert_balance(cash, balance);
        entry.validate()
    }

    pub fn render_entry(&self, entry: &LedgerEntry) -> String {
        let mut out = String::new();
        let description = normalize(&entry.description);
        if description.is_empty() {
            out.push_str(&format!("{} *\n", entry.date));
        } else {
            out.push_str(&format!("{} * {}\n", entry.date, description));
        }

        if self.options.metadata {
            if let Some(reference) = entry.reference.as_deref().map(normalize).filter(|r| !r.is_empty()) {
                out.push_str(&format!("{INDENT}; Receipt: {reference}\n"));
            }
            if let Some(time) = entry.time {
                out.push_str(&format!("{INDENT}; Time: {}\n", time.format("%H:%M:%S")));
            }
        }

        for posting in &entry.postings {
            out.push_str(&self.render_posting(posting));
            out.push('\n');
        }
        out.push('\n');
        out
    }

    fn render_posting(&self, posting: &Posting) -> String {
        let amount = posting.amount.to_string();
        let account_len = posting.account.chars().count();
        // Ledger needs two spaces between the account and the amount.
        let gap = (self.options.account_width.saturating_sub(account_len)
            + 1
            + self.options.amount_width.saturating_sub(amount.len()))
        .max(2);

        let mut line = format!(
            "{INDENT}{}{}{} {}",
            posting.account,
            " ".repeat(gap),
            amount,
            self.options.currency
        );
        if let Some(balance) = posting.balance_assertion {
            line.push_str(&format!(" = {} {}", balance, self.options.currency));
        }
        line
    }

    pub fn write_entry<W: Write>(&self, writer: &mut W, entry: &LedgerEntry) -> Result<(), LedgerError> {
        writer.write_all(self.render_entry(entry).as_bytes())?;
        Ok(())
    }

    /// Writes `account` directives for the cash and opening accounts and
    /// then `accounts` in the given order, skipping repeats.
    pub fn write_header<W: Write>(&self, writer: &mut W, accounts: &[String]) -> Result<(), LedgerError> {
        let mut seen: Vec<&str> = vec![self.options.cash_account.as_str()];
        if self.options.opening_account != self.options.cash_account {
            seen.push(&self.options.opening_account);
        }
        for account in accounts {
            if !seen.contains(&account.as_str()) {
                seen.push(account);
            }
        }
        for account in seen {
            writeln!(writer, "account {account}")?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
