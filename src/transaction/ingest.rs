//! Writing raw bank feed records into the store.

use std::collections::HashSet;

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::get_all_accounts,
    transaction::{RawTransaction, canonicalize, insert_transaction, upsert_transaction},
};

/// The outcome of ingesting a batch of raw records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Records that were not in the store before.
    pub inserted: usize,
    /// Records whose ID was already in the store. These are left untouched.
    pub duplicates: usize,
    /// Records that were malformed or refer to an unknown account.
    pub rejected: usize,
}

/// Canonicalize and insert every record in `records`.
///
/// A bad or duplicate record never aborts the batch: malformed records and
/// records for unknown accounts are counted as rejected, records whose ID is
/// already stored are counted as duplicates, and the rest of the batch carries
/// on. The batch is written in a single SQL transaction, so an unexpected
/// store failure leaves the store as it was.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn ingest_batch(
    records: &[RawTransaction],
    connection: &Connection,
) -> Result<IngestReport, Error> {
    let tx = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    let known_accounts = known_account_ids(&tx)?;
    let mut report = IngestReport::default();

    for record in records {
        let transaction = match canonicalize(record) {
            Ok(transaction) => transaction,
            Err(error) => {
                tracing::warn!("rejected record \"{}\": {error}", record.id);
                report.rejected += 1;
                continue;
            }
        };

        if !known_accounts.contains(&transaction.account_id) {
            tracing::warn!(
                "rejected record {}: unknown account \"{}\"",
                transaction.id,
                transaction.account_id
            );
            report.rejected += 1;
            continue;
        }

        match insert_transaction(&transaction, &tx) {
            Ok(()) => report.inserted += 1,
            Err(Error::ConflictingInsert) => report.duplicates += 1,
            Err(error) => return Err(error),
        }
    }

    tx.commit()?;

    tracing::info!(
        "ingested {} records: {} inserted, {} duplicates, {} rejected",
        records.len(),
        report.inserted,
        report.duplicates,
        report.rejected
    );

    Ok(report)
}

/// Canonicalize `record` and insert it, or replace the stored transaction with
/// the same ID, tags included.
///
/// Returns `true` if the transaction was not stored before.
///
/// # Errors
/// This function will return a:
/// - [Error::MalformedRecord] if `record` fails canonicalization,
/// - [Error::UnknownReference] if its account is not in the account table,
/// - [Error::SqlError] if there is an unexpected SQL error.
pub fn upsert_record(record: &RawTransaction, connection: &Connection) -> Result<bool, Error> {
    let transaction = canonicalize(record)?;

    let tx = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    if !known_account_ids(&tx)?.contains(&transaction.account_id) {
        return Err(Error::UnknownReference(format!(
            "account \"{}\"",
            transaction.account_id
        )));
    }

    let inserted = upsert_transaction(&transaction, &tx)?;
    tx.commit()?;

    Ok(inserted)
}

fn known_account_ids(connection: &Connection) -> Result<HashSet<String>, Error> {
    Ok(get_all_accounts(connection)?
        .into_iter()
        .map(|account| account.id)
        .collect())
}
