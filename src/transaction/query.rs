//! Database queries that load transactions for listing and aggregation.

use std::cmp::Ordering;

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    tag::{TagName, get_transaction_tags},
    transaction::{
        DateRange, Transaction, core::TRANSACTION_COLUMNS, map_transaction_row, to_unix_millis,
    },
};

/// Whether a range query includes transactions created exactly at its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    /// `[from, to]`
    Inclusive,
    /// `[from, to)`
    Exclusive,
}

/// The field to sort a transaction listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Sort by creation time.
    #[default]
    Time,
    /// Sort by signed amount.
    Amount,
}

/// The order to sort transactions in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    #[default]
    Descending,
}

/// Get the transactions of `account_id` created within `range`, including
/// their tags, oldest first.
///
/// Pass `is_categorizable` to only load regular transactions (`Some(true)`)
/// or transfers (`Some(false)`).
///
/// # Errors
/// Returns [Error::SqlError] if the query fails or a row cannot be mapped.
pub fn get_transactions_in_range(
    account_id: &str,
    range: DateRange,
    range_end: RangeEnd,
    is_categorizable: Option<bool>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let end_operator = match range_end {
        RangeEnd::Inclusive => "<=",
        RangeEnd::Exclusive => "<",
    };

    let mut query = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t \
        WHERE t.account_id = ?1 AND t.created_at >= ?2 AND t.created_at {end_operator} ?3"
    );
    let mut params = vec![
        Value::Text(account_id.to_owned()),
        Value::Integer(to_unix_millis(range.from())),
        Value::Integer(to_unix_millis(range.to())),
    ];

    if let Some(is_categorizable) = is_categorizable {
        query.push_str(" AND t.is_categorizable = ?4");
        params.push(Value::Integer(is_categorizable.into()));
    }

    // Sort by date, and then ID to keep transaction order stable.
    query.push_str(" ORDER BY t.created_at ASC, t.id ASC");

    let transactions = connection
        .prepare(&query)?
        .query_map(params_from_iter(params), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    let transactions = with_tags(transactions, connection)?;

    tracing::debug!(
        "loaded {} transactions for account {account_id} between {} and {}",
        transactions.len(),
        range.from(),
        range.to()
    );

    Ok(transactions)
}

/// Sort `transactions` in place by `sort_by` in `sort_order`.
///
/// Ties are broken by ID so the order is stable across calls.
pub fn sort_transactions(transactions: &mut [Transaction], sort_by: SortBy, sort_order: SortOrder) {
    transactions.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::Time => a.created_at.cmp(&b.created_at),
            SortBy::Amount => a.amount.cmp(&b.amount),
        };

        let ordering = match sort_order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };

        match ordering {
            Ordering::Equal => a.id.cmp(&b.id),
            ordering => ordering,
        }
    });
}

/// Get every transaction whose description, raw text, category ID, category
/// name or one of its tags contains `term`, ignoring case. Newest first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails or a row cannot be mapped.
pub fn search_transactions(term: &str, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t \
            LEFT JOIN category c ON c.id = t.category_id \
            WHERE instr(lower(t.description), lower(:term)) > 0 \
            OR instr(lower(coalesce(t.raw_text, '')), lower(:term)) > 0 \
            OR instr(lower(coalesce(t.category_id, '')), lower(:term)) > 0 \
            OR instr(lower(coalesce(c.name, '')), lower(:term)) > 0 \
            OR EXISTS (SELECT 1 FROM transaction_tag tt \
                WHERE tt.transaction_id = t.id AND instr(lower(tt.tag), lower(:term)) > 0) \
            ORDER BY t.created_at DESC, t.id ASC"
        ))?
        .query_map(&[(":term", &term)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    with_tags(transactions, connection)
}

/// Get every transaction that has at least one tag.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails or a row cannot be mapped.
pub fn get_tagged_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t \
            WHERE EXISTS (SELECT 1 FROM transaction_tag tt WHERE tt.transaction_id = t.id) \
            ORDER BY t.created_at ASC, t.id ASC"
        ))?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    with_tags(transactions, connection)
}

/// Get every transaction tagged with `tag`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails or a row cannot be mapped.
pub fn get_transactions_with_tag(
    tag: &TagName,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t \
            INNER JOIN transaction_tag tt ON tt.transaction_id = t.id \
            WHERE tt.tag = :tag \
            ORDER BY t.created_at ASC, t.id ASC"
        ))?
        .query_map(&[(":tag", &tag.as_ref())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    with_tags(transactions, connection)
}

fn with_tags(
    mut transactions: Vec<Transaction>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    for transaction in &mut transactions {
        transaction.tags = get_transaction_tags(transaction.id, connection)?;
    }

    Ok(transactions)
}
