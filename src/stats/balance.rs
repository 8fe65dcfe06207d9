//! Running account balance history.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use time_tz::Tz;

use crate::{
    timezone::{start_of_day, to_local},
    transaction::Transaction,
};

/// The net change and running balance for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BalancePoint {
    /// The start of the day in the reference timezone.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// The calendar year.
    pub year: i32,
    /// The month, 1-indexed.
    pub month: u8,
    /// The day of the month.
    pub day: u8,
    /// The net signed sum of the day's transactions.
    pub amount: Decimal,
    /// The running total from the start of the range up to and including
    /// this day.
    pub balance: Decimal,
}

/// Compute the running balance of `transactions`, one point per calendar day
/// in `timezone`, ascending by date.
///
/// The balance starts at zero, so it tracks the change over the transactions
/// given rather than the account's real balance. Days without transactions
/// are left out. The result does not depend on the order of `transactions`.
pub fn account_balance(transactions: &[Transaction], timezone: &Tz) -> Vec<BalancePoint> {
    let mut daily_totals: BTreeMap<Date, Decimal> = BTreeMap::new();

    for transaction in transactions {
        let date = to_local(timezone, transaction.created_at).date();
        *daily_totals.entry(date).or_insert(Decimal::ZERO) += transaction.amount;
    }

    let mut balance = Decimal::ZERO;

    daily_totals
        .into_iter()
        .map(|(date, amount)| {
            balance += amount;

            BalancePoint {
                timestamp: start_of_day(timezone, date),
                year: date.year(),
                month: u8::from(date.month()),
                day: date.day(),
                amount,
                balance,
            }
        })
        .collect()
}
