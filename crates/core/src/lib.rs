pub mod account;
pub mod money;
pub mod period;
pub mod transaction;

pub use account::{
    validate_account_name, AccountNameError, AccountType, DEFAULT_CASH_ACCOUNT, DEFAULT_CURRENCY,
    DEFAULT_OPENING_ACCOUNT,
};
pub use money::{Money, ParseMoneyError};
pub use period::{DateRangeError, DateWindow, FiscalYear};
pub use transaction::{CategorizedTransaction, Dated, Transaction};
