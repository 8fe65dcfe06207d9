//! Narrowing canonical transactions into the shape shown to callers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    category::CategoryIndex,
    money::format_currency,
    tag::TagName,
    transaction::{Transaction, TransactionId, TransactionStatus},
};

/// The externally visible view of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredTransaction {
    /// The bank's ID for the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The unprocessed text the bank received, if any.
    pub raw_text: Option<String>,
    /// The amount formatted for display, e.g. "-$12.30".
    pub amount: String,
    /// The exact amount.
    pub amount_raw: Decimal,
    /// When the transaction was created.
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    /// Whether the transaction has settled.
    pub status: TransactionStatus,
    /// The name of the transaction's category.
    pub category: String,
    /// The name of the parent of the transaction's category.
    pub parent_category: String,
    /// User defined tags, sorted.
    pub tags: Vec<TagName>,
}

/// Project `transaction` into a [FilteredTransaction], resolving category
/// names through `categories`.
///
/// # Errors
/// Returns an [Error::UnresolvedCategory] if the transaction's category is not
/// in `categories`. No empty label is ever emitted.
pub fn project(
    transaction: &Transaction,
    categories: &CategoryIndex,
) -> Result<FilteredTransaction, Error> {
    let category_id = transaction.category_id.as_deref();

    Ok(FilteredTransaction {
        id: transaction.id,
        description: transaction.description.clone(),
        raw_text: transaction.raw_text.clone(),
        amount: format_currency(transaction.amount),
        amount_raw: transaction.amount,
        time: transaction.created_at,
        status: transaction.status,
        category: categories.category_name(category_id)?,
        parent_category: categories.parent_name(category_id)?,
        tags: transaction.tags.iter().cloned().collect(),
    })
}

/// Project every transaction, failing on the first one that cannot be resolved.
///
/// # Errors
/// Returns an [Error::UnresolvedCategory] if any category cannot be resolved.
pub fn project_all(
    transactions: &[Transaction],
    categories: &CategoryIndex,
) -> Result<Vec<FilteredTransaction>, Error> {
    transactions
        .iter()
        .map(|transaction| project(transaction, categories))
        .collect()
}
