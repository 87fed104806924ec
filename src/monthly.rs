use crate::schema::Transaction;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Calendar month identifier with explicit integer arithmetic, so
/// cross-month distances never depend on day-of-month quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    fn index(&self) -> i32 {
        self.year * 12 + self.month as i32
    }

    /// Whole months from `self` to `other`; negative when `other` is earlier.
    pub fn months_until(&self, other: MonthKey) -> i32 {
        other.index() - self.index()
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Net cash movement for one calendar month. Expenses are negative, so
/// `margin()` is the month's net change.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    pub month: MonthKey,
    pub income: f64,
    pub expenses: f64,
}

impl MonthlyTotal {
    pub fn margin(&self) -> f64 {
        self.income + self.expenses
    }
}

/// Buckets transactions by calendar month, chronologically sorted.
/// The caller treats the final bucket as the incomplete current month.
pub fn aggregate(transactions: &[Transaction]) -> Vec<MonthlyTotal> {
    let mut buckets: BTreeMap<MonthKey, MonthlyTotal> = BTreeMap::new();

    for txn in transactions {
        let key = MonthKey::from_date(txn.date);
        let bucket = buckets.entry(key).or_insert(MonthlyTotal {
            month: key,
            income: 0.0,
            expenses: 0.0,
        });
        if txn.amount >= 0.0 {
            bucket.income += txn.amount;
        } else {
            bucket.expenses += txn.amount;
        }
    }

    buckets.into_values().collect()
}

/// Splits the aggregate into (complete history, incomplete current month).
/// The incomplete bucket is excluded from historical statistics but its
/// month key is retained for due-matching.
pub fn split_incomplete(totals: Vec<MonthlyTotal>) -> (Vec<MonthlyTotal>, Option<MonthlyTotal>) {
    let mut totals = totals;
    let incomplete = totals.pop();
    (totals, incomplete)
}

/// Transactions falling in the given calendar month, used for
/// reconciling the forecast against realized spending.
pub fn transactions_in_month(transactions: &[Transaction], month: MonthKey) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| MonthKey::from_date(t.date) == month)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(date: (i32, u32, u32), amount: f64) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount,
            description: "Entry".to_string(),
            category: "General".to_string(),
        }
    }

    #[test]
    fn test_aggregate_income_expense_split() {
        let transactions = vec![
            txn((2016, 1, 5), -40.0),
            txn((2016, 1, 15), 2500.0),
            txn((2016, 1, 20), -60.0),
            txn((2016, 2, 3), -30.0),
        ];

        let totals = aggregate(&transactions);
        assert_eq!(totals.len(), 2);

        assert_eq!(totals[0].month, MonthKey { year: 2016, month: 1 });
        assert_eq!(totals[0].income, 2500.0);
        assert_eq!(totals[0].expenses, -100.0);
        assert_eq!(totals[0].margin(), 2400.0);

        assert_eq!(totals[1].month, MonthKey { year: 2016, month: 2 });
        assert_eq!(totals[1].income, 0.0);
        assert_eq!(totals[1].expenses, -30.0);
    }

    #[test]
    fn test_aggregate_sorted_across_year_boundary() {
        let transactions = vec![
            txn((2016, 1, 5), -10.0),
            txn((2015, 12, 5), -10.0),
            txn((2015, 11, 5), -10.0),
        ];

        let totals = aggregate(&transactions);
        let months: Vec<MonthKey> = totals.iter().map(|t| t.month).collect();
        assert_eq!(
            months,
            vec![
                MonthKey { year: 2015, month: 11 },
                MonthKey { year: 2015, month: 12 },
                MonthKey { year: 2016, month: 1 },
            ]
        );
    }

    #[test]
    fn test_split_incomplete() {
        let totals = aggregate(&[txn((2016, 1, 5), -10.0), txn((2016, 2, 5), -10.0)]);
        let (complete, incomplete) = split_incomplete(totals);
        assert_eq!(complete.len(), 1);
        assert_eq!(
            incomplete.unwrap().month,
            MonthKey { year: 2016, month: 2 }
        );
    }

    #[test]
    fn test_months_until() {
        let a = MonthKey { year: 2015, month: 11 };
        let b = MonthKey { year: 2016, month: 2 };
        assert_eq!(a.months_until(b), 3);
        assert_eq!(b.months_until(a), -3);
    }

    #[test]
    fn test_transactions_in_month() {
        let transactions = vec![txn((2016, 1, 5), -10.0), txn((2016, 2, 5), -20.0)];
        let selected =
            transactions_in_month(&transactions, MonthKey { year: 2016, month: 2 });
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].amount, -20.0);
    }
}
