pub mod balance;
pub mod entry;
pub mod format;
pub mod pipeline;

pub use balance::{BalanceTracker, Tracked, TrackedTransaction};
pub use entry::{LedgerEntry, LedgerError, Posting};
pub use format::{FormatOptions, LedgerFormatter};
pub use pipeline::{write_ledger, RunSummary};
