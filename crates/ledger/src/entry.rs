use chrono::{NaiveDate, NaiveTime};
use pesa_core::{CategorizedTransaction, Money};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Unbalanced entry '{description}' on {date}: postings sum to {total}")]
    Unbalanced {
        date: NaiveDate,
        description: String,
        total: Money,
    },
    #[error("Entry must have at least two postings")]
    TooFewPostings,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub account: String,
    pub amount: Money,
    /// Expected account balance after this posting, written as `= <balance>`.
    pub balance_assertion: Option<Money>,
}

impl Posting {
    pub fn new(account: impl Into<String>, amount: Money) -> Self {
        Posting {
            account: account.into(),
            amount,
            balance_assertion: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub reference: Option<String>,
    pub description: String,
    pub postings: Vec<Posting>,
}

impl LedgerEntry {
    /// Two postings: the resolved account takes the amount, the cash
    /// account takes its negation.
    pub fn from_categorized(tx: &CategorizedTransaction, cash_account: &str) -> Self {
        let t = &tx.transaction;
        LedgerEntry {
            date: t.date,
            time: t.time,
            reference: t.reference.clone(),
            description: t.description.clone(),
            postings: vec![
                Posting::new(tx.account.clone(), t.amount),
                Posting::new(cash_account, -t.amount),
            ],
        }
    }

    /// Brings `cash_account` from zero to `balance`, balanced against
    /// `equity_account`.
    pub fn opening(date: NaiveDate, balance: Money, cash_account: &str, equity_account: &str) -> Self {
        LedgerEntry {
            date,
            time: None,
            reference: None,
            description: "Opening balance".to_string(),
            postings: vec![
                Posting::new(cash_account, balance),
                Posting::new(equity_account, -balance),
            ],
        }
    }

    pub fn total(&self) -> Money {
        self.postings.iter().map(|p| p.amount).sum()
    }

    pub fn validate(self) -> Result<Self, LedgerError> {
        if self.postings.len() < 2 {
            return Err(LedgerError::TooFewPostings);
        }
        let total = self.total();
        if !total.is_zero() {
            return Err(LedgerError::Unbalanced {
                date: self.date,
                description: self.description,
                total,
            });
        }
        Ok(self)
    }

    /// Attaches a balance assertion to the last posting to `account`.
    /// Returns false when the entry has no such posting.
    pub fn assert_balance(&mut self, account: &str, balance: Money) -> bool {
        match self.postings.iter_mut().rev().find(|p| p.account == account) {
            Some(posting) => {
                posting.balance_assertion = Some(balance);
                true
            }
            None => false,
        }
    }
}
