use pesa_core::{CategorizedTransaction, Money, Transaction};
use std::collections::BTreeMap;
use std::iter::Peekable;

/// A categorized transaction with its running balance resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTransaction {
    pub transaction: CategorizedTransaction,
    pub balance: Option<Money>,
    /// Last transaction of its date in the stream.
    pub closes_day: bool,
}

impl TrackedTransaction {
    /// The balance to assert at the end of the day, if this transaction
    /// closes one and the balance is known.
    pub fn day_close_balance(&self) -> Option<Money> {
        if self.closes_day {
            self.balance
        } else {
            None
        }
    }
}

/// Running balance of the cash account plus per-account totals.
///
/// A reported statement balance is always taken as is. Only when a row has
/// none is it derived from the previous known balance, since outflows are
/// positive amounts.
///
/// The opening balance is the cash balance before the first recorded
/// transaction. It is known once any recorded row has a balance.
#[derive(Debug, Clone, Default)]
pub struct BalanceTracker {
    last_balance: Option<Money>,
    opening_balance: Option<Money>,
    /// Sum of recorded amounts.
    flow: Money,
    account_totals: BTreeMap<String, Money>,
    default_count: usize,
    count: usize,
}

impl BalanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carries the balance of a row that precedes the output window, so the
    /// first recorded row can derive its own. Nothing else is counted.
    pub fn prime(&mut self, tx: &Transaction) {
        if let Some(balance) = self.next_balance(tx) {
            self.last_balance = Some(balance);
        }
    }

    pub fn record(&mut self, tx: &CategorizedTransaction) -> Option<Money> {
        let t = &tx.transaction;
        let balance = self.next_balance(t);
        self.flow += t.amount;
        if let Some(balance) = balance {
            self.last_balance = Some(balance);
            self.opening_balance.get_or_insert(balance + self.flow);
        }

        *self
            .account_totals
            .entry(tx.account.clone())
            .or_insert_with(Money::zero) += t.amount;
        if tx.is_default() {
            self.default_count += 1;
        }
        self.count += 1;

        balance
    }

    fn next_balance(&self, tx: &Transaction) -> Option<Money> {
        tx.balance
            .or_else(|| self.last_balance.map(|previous| previous - tx.amount))
    }

    pub fn opening_balance(&self) -> Option<Money> {
        self.opening_balance
    }

    pub fn closing_balance(&self) -> Option<Money> {
        self.last_balance
    }

    /// Sum of amounts per resolved account, ordered by account name.
    pub fn account_totals(&self) -> &BTreeMap<String, Money> {
        &self.account_totals
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Transactions that fell through to the default account.
    pub fn default_count(&self) -> usize {
        self.default_count
    }

    pub fn track<I>(self, transactions: I) -> Tracked<I::IntoIter>
    where
        I: IntoIterator<Item = CategorizedTransaction>,
    {
        Tracked {
            inner: transactions.into_iter().peekable(),
            tracker: self,
        }
    }
}

/// Iterator returned by [`BalanceTracker::track`]. Looks one item ahead to
/// find day boundaries.
pub struct Tracked<I: Iterator> {
    inner: Peekable<I>,
    tracker: BalanceTracker,
}

impl<I: Iterator> Tracked<I> {
    pub fn tracker(&self) -> &BalanceTracker {
        &self.tracker
    }

    pub fn into_tracker(self) -> BalanceTracker {
        self.tracker
    }
}

impl<I> Iterator for Tracked<I>
where
    I: Iterator<Item = CategorizedTransaction>,
{
    type Item = TrackedTransaction;

    fn next(&mut self) -> Option<Self::Item> {
        let transaction = self.inner.next()?;
        let balance = self.tracker.record(&transaction);
        let closes_day = self
            .inner
            .peek()
            .map_or(true, |next| next.transaction.date != transaction.transaction.date);
        Some(TrackedTransaction { transaction, balance, closes_day })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pesa_core::Transaction;

    fn tx(day: u32, cents: i64, balance: Option<i64>, account: &str) -> CategorizedTransaction {
        let mut t = Transaction::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            "x",
            Money::from_cents(cents),
        );
        t.balance = balance.map(Money::from_cents);
        CategorizedTransaction {
            transaction: t,
            account: account.to_string(),
            rule_index: (account != "Expenses:Uncategorized").then_some(0),
        }
    }

    #[test]
    fn marks_last_transaction_of_each_day() {
        let tracked: Vec<_> = BalanceTracker::new()
            .track(vec![
                tx(15, 100, Some(900), "Expenses:A"),
                tx(15, 100, Some(800), "Expenses:A"),
                tx(16, 100, Some(700), "Expenses:A"),
            ])
            .collect();
        let closes: Vec<_> = tracked.iter().map(|t| t.closes_day).collect();
        assert_eq!(closes, [false, true, true]);
        assert_eq!(tracked[0].day_close_balance(), None);
        assert_eq!(tracked[1].day_close_balance(), Some(Money::from_cents(800)));
        assert_eq!(tracked[2].day_close_balance(), Some(Money::from_cents(700)));
    }

    #[test]
    fn reported_balance_is_used_verbatim() {
        // Reported balance disagrees with arithmetic; it still wins.
        let tracked: Vec<_> = BalanceTracker::new()
            .track(vec![tx(15, 100, Some(1000), "Expenses:A"), tx(15, 100, Some(5000), "Expenses:A")])
            .collect();
        assert_eq!(tracked[1].balance, Some(Money::from_cents(5000)));
    }

    #[test]
    fn missing_balance_is_derived_from_previous() {
        let tracked: Vec<_> = BalanceTracker::new()
            .track(vec![
                tx(15, 100, Some(1000), "Expenses:A"),
                tx(15, 250, None, "Expenses:A"),
                tx(15, -500, None, "Income:B"),
            ])
            .collect();
        assert_eq!(tracked[1].balance, Some(Money::from_cents(750)));
        assert_eq!(tracked[2].balance, Some(Money::from_cents(1250)));
    }

    #[test]
    fn balance_stays_unknown_without_any_report() {
        let tracked: Vec<_> = BalanceTracker::new()
            .track(vec![tx(15, 100, None, "Expenses:A")])
            .collect();
        assert!(tracked[0].closes_day);
        assert_eq!(tracked[0].day_close_balance(), None);
    }

    #[test]
    fn keeps_per_account_totals() {
        let mut tracked = BalanceTracker::new().track(vec![
            tx(15, 100, Some(900), "Expenses:A"),
            tx(15, 50, Some(850), "Expenses:Uncategorized"),
            tx(16, 25, Some(825), "Expenses:A"),
        ]);
        for _ in tracked.by_ref() {}
        let tracker = tracked.into_tracker();
        assert_eq!(tracker.count(), 3);
        assert_eq!(tracker.default_count(), 1);
        assert_eq!(tracker.account_totals()["Expenses:A"], Money::from_cents(125));
        assert_eq!(tracker.closing_balance(), Some(Money::from_cents(825)));
    }

    #[test]
    fn opening_balance_adds_back_earlier_flow() {
        let mut tracked = BalanceTracker::new().track(vec![
            tx(15, 100, None, "Expenses:A"),
            tx(15, -300, None, "Income:B"),
            tx(16, 50, Some(1000), "Expenses:A"),
        ]);
        tracked.next();
        tracked.next();
        assert_eq!(tracked.tracker().opening_balance(), None);
        tracked.next();
        // 1000 + 100 - 300 + 50
        assert_eq!(tracked.tracker().opening_balance(), Some(Money::from_cents(850)));
    }

    #[test]
    fn primed_balance_feeds_first_recorded_row() {
        let mut tracker = BalanceTracker::new();
        tracker.prime(&tx(14, 100, Some(2000), "Expenses:A").transaction);
        tracker.prime(&tx(14, 500, None, "Expenses:A").transaction);
        let tracked: Vec<_> = tracker.track(vec![tx(15, 200, None, "Expenses:A")]).collect();
        assert_eq!(tracked[0].balance, Some(Money::from_cents(1300)));
    }

    #[test]
    fn priming_is_not_counted() {
        let mut tracker = BalanceTracker::new();
        tracker.prime(&tx(14, 100, Some(2000), "Expenses:A").transaction);
        assert_eq!(tracker.count(), 0);
        assert!(tracker.account_totals().is_empty());
        assert_eq!(tracker.opening_balance(), None);

        let mut tracked = tracker.track(vec![tx(15, 200, None, "Expenses:A")]);
        tracked.next();
        assert_eq!(tracked.tracker().opening_balance(), Some(Money::from_cents(2000)));
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let mut tracked = BalanceTracker::new().track(Vec::new());
        assert!(tracked.next().is_none());
        assert_eq!(tracked.tracker().closing_balance(), None);
    }
}
