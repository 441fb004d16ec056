use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Balancing account every statement transaction is posted against.
pub const DEFAULT_CASH_ACCOUNT: &str = "Assets:Checking:Mpesa";

pub const DEFAULT_CURRENCY: &str = "KES";

/// Counter-account of the opening balance entry.
pub const DEFAULT_OPENING_ACCOUNT: &str = "Equity:Opening Balances";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Asset => write!(f, "Asset"),
            AccountType::Liability => write!(f, "Liability"),
            AccountType::Equity => write!(f, "Equity"),
            AccountType::Income => write!(f, "Income"),
            AccountType::Expense => write!(f, "Expense"),
        }
    }
}

impl AccountType {
    /// Classifies a ledger account by its top-level segment, e.g.
    /// `Expenses:Transport` is an expense. Unknown roots yield `None`.
    pub fn of(account: &str) -> Option<Self> {
        let root = account.split(':').next()?.trim().to_lowercase();
        match root.as_str() {
            "assets" | "asset" => Some(AccountType::Asset),
            "liabilities" | "liability" => Some(AccountType::Liability),
            "equity" => Some(AccountType::Equity),
            "income" | "revenue" | "revenues" => Some(AccountType::Income),
            "expenses" | "expense" => Some(AccountType::Expense),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountNameError {
    #[error("account name is empty")]
    Empty,
    #[error("account name contains a tab")]
    Tab,
    #[error("account name contains two consecutive spaces")]
    DoubleSpace,
    #[error("account name has an empty segment")]
    EmptySegment,
}

/// Checks that `name` can be written as a ledger posting account.
///
/// Ledger separates the account from the amount with a tab or two spaces,
/// so neither may appear inside the name.
pub fn validate_account_name(name: &str) -> Result<(), AccountNameError> {
    if name.trim().is_empty() {
        return Err(AccountNameError::Empty);
    }
    if name.contains('\t') {
        return Err(AccountNameError::Tab);
    }
    if name.contains("  ") {
        return Err(AccountNameError::DoubleSpace);
    }
    if name.split(':').any(|segment| segment.trim().is_empty()) {
        return Err(AccountNameError::EmptySegment);
    }
    Ok(())
}
