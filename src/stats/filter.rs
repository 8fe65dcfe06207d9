//! Filter stages shared by the rollups.

use crate::transaction::Transaction;

/// Description prefixes the bank uses for money moved between the user's own
/// accounts.
pub const TRANSFER_PREFIXES: [&str; 5] = [
    "Transfer from",
    "Auto Transfer from",
    "Transfer to",
    "Auto Transfer to",
    "Forward to",
];

/// Whether `description` marks an internal transfer.
///
/// This is a case-sensitive prefix test: "Refund: Transfer to store" is not a
/// transfer.
pub fn is_transfer(description: &str) -> bool {
    TRANSFER_PREFIXES
        .iter()
        .any(|prefix| description.starts_with(prefix))
}

/// Drop transactions whose description marks them as internal transfers.
pub fn exclude_transfers<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> impl Iterator<Item = &'a Transaction> {
    transactions
        .into_iter()
        .filter(|transaction| !is_transfer(&transaction.description))
}

/// Drop transactions flagged as not categorizable.
pub fn categorizable<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> impl Iterator<Item = &'a Transaction> {
    transactions
        .into_iter()
        .filter(|transaction| transaction.is_categorizable)
}
