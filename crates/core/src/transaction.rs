use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::money::Money;

/// One record from the statement, as produced by extraction.
///
/// `amount` is positive for outflows and negative for inflows. `balance`
/// is the running wallet balance reported by the statement, when it has one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub reference: Option<String>,
    pub description: String,
    pub amount: Money,
    pub balance: Option<Money>,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: Money) -> Self {
        Transaction {
            date,
            time: None,
            reference: None,
            description: description.into(),
            amount,
            balance: None,
        }
    }

    pub fn with_balance(mut self, balance: Money) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_time(mut self, time: NaiveTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// A transaction together with the account the rules resolved it to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedTransaction {
    pub transaction: Transaction,
    pub account: String,
    /// Position of the matching rule, `None` when the default account was used.
    pub rule_index: Option<usize>,
}

impl CategorizedTransaction {
    pub fn is_default(&self) -> bool {
        self.rule_index.is_none()
    }
}

/// Anything that sits on a calendar date, so it can be windowed.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for Transaction {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for CategorizedTransaction {
    fn date(&self) -> NaiveDate {
        self.transaction.date
    }
}

impl<T: Dated> Dated for &T {
    fn date(&self) -> NaiveDate {
        (*self).date()
    }
}
