//! Reader for M-Pesa statements after extraction: CSV or a JSON array of
//! row objects, one row per statement line.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pesa_core::{Money, Transaction};
use std::io::Read;
use thiserror::Error;

pub const RECEIPT_COLUMN: &str = "Receipt No";
pub const TIME_COLUMN: &str = "Completion Time";
pub const DETAILS_COLUMN: &str = "Details";
pub const STATUS_COLUMN: &str = "Transaction Status";
pub const PAID_IN_COLUMN: &str = "Paid In";
pub const WITHDRAWN_COLUMN: &str = "Withdrawn";
pub const BALANCE_COLUMN: &str = "Balance";

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("Record {record}: invalid completion time '{value}'")]
    InvalidDate { record: usize, value: String },
    #[error("Record {record}: invalid amount in '{column}': '{value}'")]
    InvalidAmount {
        record: usize,
        column: &'static str,
        value: String,
    },
}

/// One statement line with every cell as raw text.
#[derive(Debug, Default)]
struct RawRow {
    receipt: Option<String>,
    completion_time: Option<String>,
    details: Option<String>,
    status: Option<String>,
    paid_in: Option<String>,
    withdrawn: Option<String>,
    balance: Option<String>,
}

impl RawRow {
    fn is_blank(&self) -> bool {
        [
            &self.receipt,
            &self.completion_time,
            &self.details,
            &self.status,
            &self.paid_in,
            &self.withdrawn,
            &self.balance,
        ]
        .iter()
        .all(|cell| cell.is_none())
    }

    fn is_completed(&self) -> bool {
        self.status
            .as_deref()
            .map_or(true, |s| s.eq_ignore_ascii_case("completed"))
    }

    fn into_transaction(self, record: usize) -> Result<Transaction, StatementError> {
        let raw_time = self
            .completion_time
            .ok_or(StatementError::InvalidDate { record, value: String::new() })?;
        let (date, time) = parse_completion_time(&raw_time)
            .ok_or_else(|| StatementError::InvalidDate { record, value: raw_time.clone() })?;

        let paid_in = parse_cell(self.paid_in, record, PAID_IN_COLUMN)?.unwrap_or_else(Money::zero);
        let withdrawn = parse_cell(self.withdrawn, record, WITHDRAWN_COLUMN)?.unwrap_or_else(Money::zero);
        let balance = parse_cell(self.balance, record, BALANCE_COLUMN)?;

        // Positive amounts leave the wallet.
        let amount = if paid_in.amount().is_sign_positive() && !paid_in.is_zero() {
            -paid_in
        } else {
            withdrawn.abs()
        };

        let mut tx = Transaction::new(date, self.details.unwrap_or_default(), amount);
        tx.time = time;
        tx.reference = self.receipt;
        tx.balance = balance;
        Ok(tx)
    }
}

fn parse_cell(
    cell: Option<String>,
    record: usize,
    column: &'static str,
) -> Result<Option<Money>, StatementError> {
    cell.map(|value| {
        Money::parse(&value).map_err(|_| StatementError::InvalidAmount { record, column, value })
    })
    .transpose()
}

fn parse_completion_time(s: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let s = s.trim();

    for fmt in &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some((dt.date(), Some(dt.time())));
        }
    }

    let date_part = s.split_whitespace().next().unwrap_or(s);
    for fmt in &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some((date, None));
        }
    }

    None
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Reads a whole statement, detecting JSON (a leading `[`) or CSV.
///
/// Rows whose status is not `completed` are skipped. The result is in
/// chronological order.
pub fn read_statement<R: Read>(mut reader: R) -> Result<Vec<Transaction>, StatementError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    parse_statement(&data)
}

pub fn parse_statement(data: &[u8]) -> Result<Vec<Transaction>, StatementError> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let is_json = data
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'[');

    let rows = if is_json { json_rows(data)? } else { csv_rows(data)? };

    let mut transactions = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for (index, row) in rows.into_iter().enumerate() {
        let record = index + 1;
        if row.is_blank() {
            continue;
        }
        if !row.is_completed() {
            tracing::debug!(record, status = ?row.status, "skipping row that is not completed");
            skipped += 1;
            continue;
        }
        transactions.push(row.into_transaction(record)?);
    }

    into_chronological(&mut transactions);
    tracing::debug!(
        rows = transactions.len(),
        skipped,
        format = if is_json { "json" } else { "csv" },
        "statement read"
    );
    Ok(transactions)
}

/// Statements list the newest line first. Reversing before the stable sort
/// keeps lines that share a timestamp in the order they happened.
fn into_chronological(transactions: &mut [Transaction]) {
    let key = |tx: &Transaction| (tx.date, tx.time);
    if let (Some(first), Some(last)) = (transactions.first(), transactions.last()) {
        if key(first) > key(last) {
            transactions.reverse();
        }
    }
    transactions.sort_by_key(key);
}

fn csv_rows(data: &[u8]) -> Result<Vec<RawRow>, StatementError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    let time_col = column(TIME_COLUMN).ok_or(StatementError::MissingColumn(TIME_COLUMN))?;
    let details_col = column(DETAILS_COLUMN).ok_or(StatementError::MissingColumn(DETAILS_COLUMN))?;
    let paid_in_col = column(PAID_IN_COLUMN);
    let withdrawn_col = column(WITHDRAWN_COLUMN);
    if paid_in_col.is_none() && withdrawn_col.is_none() {
        return Err(StatementError::MissingColumn(WITHDRAWN_COLUMN));
    }
    let receipt_col = column(RECEIPT_COLUMN);
    let status_col = column(STATUS_COLUMN);
    let balance_col = column(BALANCE_COLUMN);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let cell = |col: Option<usize>| col.and_then(|c| record.get(c)).and_then(non_blank);
        rows.push(RawRow {
            receipt: cell(receipt_col),
            completion_time: cell(Some(time_col)),
            details: cell(Some(details_col)),
            status: cell(status_col),
            paid_in: cell(paid_in_col),
            withdrawn: cell(withdrawn_col),
            balance: cell(balance_col),
        });
    }
    Ok(rows)
}

fn json_rows(data: &[u8]) -> Result<Vec<RawRow>, StatementError> {
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_slice(data)?;

    Ok(objects
        .into_iter()
        .map(|object| {
            let cell = |name: &str| {
                object
                    .iter()
                    .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
                    .and_then(|(_, value)| match value {
                        serde_json::Value::Null => None,
                        serde_json::Value::String(s) => non_blank(s),
                        other => non_blank(&other.to_string()),
                    })
            };
            RawRow {
                receipt: cell(RECEIPT_COLUMN),
                completion_time: cell(TIME_COLUMN),
                details: cell(DETAILS_COLUMN),
                status: cell(STATUS_COLUMN),
                paid_in: cell(PAID_IN_COLUMN),
                withdrawn: cell(WITHDRAWN_COLUMN),
                balance: cell(BALANCE_COLUMN),
            }
        })
        .collect())
}
