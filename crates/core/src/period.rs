use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::transaction::Dated;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear(pub i32);

impl FiscalYear {
    pub fn containing(date: NaiveDate) -> Self {
        FiscalYear(date.year())
    }

    /// January 1 of this year. Years outside chrono's range clamp to its minimum.
    pub fn start_date(self) -> NaiveDate {
        NaiveDate::from_yo_opt(self.0, 1).unwrap_or(NaiveDate::MIN)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("End date {end} precedes start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// Inclusive date window. A missing `end` leaves the window open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: Option<NaiveDate>,
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{} to {}", self.start, end),
            None => write!(f, "{} to end of data", self.start),
        }
    }
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, DateRangeError> {
        if let Some(end) = end {
            if end < start {
                return Err(DateRangeError::EndBeforeStart { start, end });
            }
        }
        Ok(DateWindow { start, end })
    }

    /// Builds a window from optional bounds; the start falls back to
    /// January 1 of the year `today` is in.
    pub fn from_options(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, DateRangeError> {
        let start = start.unwrap_or_else(|| FiscalYear::containing(today).start_date());
        DateWindow::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.map_or(true, |end| date <= end)
    }

    /// Lazily keeps the items inside the window, in their original order.
    pub fn filter<I>(self, items: I) -> impl Iterator<Item = I::Item>
    where
        I: IntoIterator,
        I::Item: Dated,
    {
        items.into_iter().filter(move |item| self.contains(item.date()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::transaction::Transaction;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(d: NaiveDate, desc: &str) -> Transaction {
        Transaction::new(d, desc, Money::from_cents(100))
    }

    #[test]
    fn fiscal_year_starts_on_january_first() {
        assert_eq!(FiscalYear::containing(date(2026, 10, 14)).start_date(), date(2026, 1, 1));
        assert_eq!(FiscalYear(2024).start_date(), date(2024, 1, 1));
    }

    #[test]
    fn window_rejects_end_before_start() {
        let err = DateWindow::new(date(2024, 2, 1), Some(date(2024, 1, 31))).unwrap_err();
        assert_eq!(
            err,
            DateRangeError::EndBeforeStart { start: date(2024, 2, 1), end: date(2024, 1, 31) }
        );
    }

    #[test]
    fn single_day_window_is_valid() {
        let w = DateWindow::new(date(2024, 2, 1), Some(date(2024, 2, 1))).unwrap();
        assert!(w.contains(date(2024, 2, 1)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let w = DateWindow::new(date(2024, 1, 1), Some(date(2024, 1, 31))).unwrap();
        assert!(w.contains(date(2024, 1, 1)));
        assert!(w.contains(date(2024, 1, 31)));
        assert!(!w.contains(date(2023, 12, 31)));
        assert!(!w.contains(date(2024, 2, 1)));
    }

    #[test]
    fn open_end_has_no_upper_bound() {
        let w = DateWindow::new(date(2024, 1, 1), None).unwrap();
        assert!(w.contains(date(2099, 12, 31)));
        assert!(!w.contains(date(2023, 12, 31)));
    }

    #[test]
    fn default_start_is_january_first_of_current_year() {
        let w = DateWindow::from_options(None, None, date(2026, 10, 14)).unwrap();
        assert_eq!(w.start(), date(2026, 1, 1));
        assert_eq!(w.end(), None);
    }

    #[test]
    fn explicit_start_wins_over_default() {
        let w = DateWindow::from_options(Some(date(2023, 6, 1)), None, date(2026, 10, 14)).unwrap();
        assert_eq!(w.start(), date(2023, 6, 1));
    }

    #[test]
    fn filter_preserves_order_and_fields() {
        let w = DateWindow::new(date(2024, 1, 10), Some(date(2024, 1, 20))).unwrap();
        let txs = vec![
            tx(date(2024, 1, 20), "late"),
            tx(date(2024, 1, 9), "before"),
            tx(date(2024, 1, 10), "early"),
            tx(date(2024, 1, 21), "after"),
        ];
        let kept: Vec<_> = w.filter(txs).collect();
        let names: Vec<_> = kept.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, ["late", "early"]);
    }

    #[test]
    fn filter_works_on_borrowed_items() {
        let w = DateWindow::new(date(2024, 1, 1), None).unwrap();
        let txs = [tx(date(2024, 3, 1), "a"), tx(date(2023, 3, 1), "b")];
        assert_eq!(w.filter(txs.iter()).count(), 1);
    }

    #[test]
    fn window_display() {
        let closed = DateWindow::new(date(2024, 1, 1), Some(date(2024, 12, 31))).unwrap();
        assert_eq!(closed.to_string(), "2024-01-01 to 2024-12-31");
        let open = DateWindow::new(date(2024, 1, 1), None).unwrap();
        assert_eq!(open.to_string(), "2024-01-01 to end of data");
    }
}
