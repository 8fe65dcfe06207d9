//! Calendar month rollups.
//!
//! Transactions are bucketed by the month their `created_at` falls in, as
//! seen from the reference timezone rather than UTC. A purchase made just
//! after midnight on the first of a month in Melbourne belongs to that month
//! even though it is still the previous month in UTC.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Month, OffsetDateTime};
use time_tz::Tz;

use crate::{
    Error,
    category::{CategoryIndex, CategoryKind},
    stats::filter::{categorizable, exclude_transfers},
    timezone::to_local,
    transaction::Transaction,
};

/// Income and expense totals for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonthlyStat {
    /// The calendar year.
    pub year: i32,
    /// The month, 0-indexed: January is 0 and December is 11.
    pub month: u8,
    /// The sum of the non-negative amounts.
    pub income: Decimal,
    /// The magnitude of the sum of the negative amounts.
    pub expenses: Decimal,
    /// The number of transactions in the month.
    pub transactions: usize,
}

/// The total for one category within a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAmount {
    /// The category name, or [crate::category::UNCATEGORISED].
    pub category: String,
    /// The magnitude of the signed total.
    pub amount: Decimal,
}

/// The per-category totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPeriodStat {
    /// The calendar year.
    pub year: i32,
    /// The month, 1-indexed: January is 1 and December is 12.
    pub month: u8,
    /// A short label for the period, e.g. "Mar 24".
    pub formatted_date: String,
    /// Totals sorted by amount descending, then by name.
    pub categories: Vec<CategoryAmount>,
}

/// The year and month `date_time` falls in within `timezone`.
pub fn month_bucket(date_time: OffsetDateTime, timezone: &Tz) -> (i32, Month) {
    let local = to_local(timezone, date_time);

    (local.year(), local.month())
}

/// Total income and expenses per calendar month, ascending by month.
///
/// Internal transfers are excluded from both the totals and the counts.
/// A zero amount counts as income.
pub fn monthly_stats(transactions: &[Transaction], timezone: &Tz) -> Vec<MonthlyStat> {
    #[derive(Default)]
    struct Totals {
        income: Decimal,
        expenses: Decimal,
        count: usize,
    }

    let mut buckets: BTreeMap<(i32, u8), Totals> = BTreeMap::new();

    for transaction in exclude_transfers(transactions) {
        let (year, month) = month_bucket(transaction.created_at, timezone);
        let totals = buckets.entry((year, u8::from(month))).or_default();

        if transaction.amount < Decimal::ZERO {
            totals.expenses += transaction.amount;
        } else {
            totals.income += transaction.amount;
        }
        totals.count += 1;
    }

    buckets
        .into_iter()
        .map(|((year, month), totals)| MonthlyStat {
            year,
            month: month - 1,
            income: totals.income,
            expenses: totals.expenses.abs(),
            transactions: totals.count,
        })
        .collect()
}

/// Total spending per category per calendar month, ascending by month.
///
/// Internal transfers, whether flagged as not categorizable or recognised by
/// their description, are excluded. `kind` selects whether transactions are
/// grouped under their own category or its parent.
///
/// # Errors
/// Returns an [Error::UnresolvedCategory] if a transaction's category is not in
/// `categories`.
pub fn category_by_period(
    transactions: &[Transaction],
    categories: &CategoryIndex,
    kind: CategoryKind,
    timezone: &Tz,
) -> Result<Vec<CategoryPeriodStat>, Error> {
    let mut buckets: BTreeMap<(i32, u8), (Month, HashMap<String, Decimal>)> = BTreeMap::new();

    for transaction in exclude_transfers(categorizable(transactions)) {
        let (year, month) = month_bucket(transaction.created_at, timezone);
        let label = categories.label(transaction.category_id.as_deref(), kind)?;

        let (_, totals) = buckets
            .entry((year, u8::from(month)))
            .or_insert_with(|| (month, HashMap::new()));
        *totals.entry(label).or_insert(Decimal::ZERO) += transaction.amount;
    }

    Ok(buckets
        .into_iter()
        .map(|((year, _), (month, totals))| {
            let mut amounts: Vec<CategoryAmount> = totals
                .into_iter()
                .map(|(category, amount)| CategoryAmount {
                    category,
                    amount: amount.abs(),
                })
                .collect();
            amounts.sort_by(|a, b| {
                b.amount
                    .cmp(&a.amount)
                    .then_with(|| a.category.cmp(&b.category))
            });

            CategoryPeriodStat {
                year,
                month: u8::from(month),
                formatted_date: format_period(year, month),
                categories: amounts,
            }
        })
        .collect())
}

/// Format a month as a short label, e.g. "Mar 24".
fn format_period(year: i32, month: Month) -> String {
    let month = match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    };

    format!("{month} {:02}", year.rem_euclid(100))
}
