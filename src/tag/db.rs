//! Transaction-tag junction table operations.
//!
//! Tags are not a standalone entity: a tag exists as long as at least one
//! transaction carries it. Each row of the junction table pairs a transaction
//! with one tag, so adding or removing a tag is a single row-level statement
//! and concurrent edits of different tags never overwrite each other.

use std::collections::BTreeSet;

use rusqlite::Connection;

use crate::{
    Error,
    tag::TagName,
    transaction::{TransactionId, transaction_exists},
};

/// Create the transaction_tag junction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS transaction_tag (
            transaction_id BLOB NOT NULL,
            tag TEXT NOT NULL,
            PRIMARY KEY(transaction_id, tag),
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id)
                ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_tag_tag ON transaction_tag(tag);",
    )?;

    Ok(())
}

/// Add `tags` to a transaction, leaving every other field untouched.
///
/// Tags the transaction already has are ignored.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `transaction_id` does not refer to a transaction,
/// - [Error::SqlError] if there is some other SQL error.
pub fn add_tags(
    transaction_id: TransactionId,
    tags: &[TagName],
    connection: &Connection,
) -> Result<(), Error> {
    if !transaction_exists(transaction_id, connection)? {
        return Err(Error::NotFound);
    }

    let mut stmt = connection
        .prepare("INSERT OR IGNORE INTO transaction_tag (transaction_id, tag) VALUES (?1, ?2)")?;

    for tag in tags {
        stmt.execute((transaction_id, tag.as_ref()))?;
    }

    Ok(())
}

/// Remove `tags` from a transaction, leaving every other field untouched.
///
/// Tags the transaction does not have are ignored.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `transaction_id` does not refer to a transaction,
/// - [Error::SqlError] if there is some other SQL error.
pub fn remove_tags(
    transaction_id: TransactionId,
    tags: &[TagName],
    connection: &Connection,
) -> Result<(), Error> {
    if !transaction_exists(transaction_id, connection)? {
        return Err(Error::NotFound);
    }

    let mut stmt =
        connection.prepare("DELETE FROM transaction_tag WHERE transaction_id = ?1 AND tag = ?2")?;

    for tag in tags {
        stmt.execute((transaction_id, tag.as_ref()))?;
    }

    Ok(())
}

/// Get all tags for a transaction.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_transaction_tags(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<BTreeSet<TagName>, Error> {
    connection
        .prepare("SELECT tag FROM transaction_tag WHERE transaction_id = ?1")?
        .query_map([transaction_id], |row| {
            let raw_tag: String = row.get(0)?;
            Ok(TagName::new_unchecked(&raw_tag))
        })?
        .map(|maybe_tag| maybe_tag.map_err(Error::SqlError))
        .collect()
}

/// Set tags for a transaction, replacing any existing tags.
///
/// **Note**: If you want the replacement to be atomic, pass in a transaction
/// for `connection`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn set_transaction_tags(
    transaction_id: TransactionId,
    tags: &BTreeSet<TagName>,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM transaction_tag WHERE transaction_id = ?1",
        [transaction_id],
    )?;

    let mut stmt =
        connection.prepare("INSERT INTO transaction_tag (transaction_id, tag) VALUES (?1, ?2)")?;

    for tag in tags {
        stmt.execute((transaction_id, tag.as_ref()))?;
    }

    Ok(())
}

/// Get every distinct tag in use, sorted.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_unique_tags(connection: &Connection) -> Result<Vec<TagName>, Error> {
    connection
        .prepare("SELECT DISTINCT tag FROM transaction_tag ORDER BY tag ASC")?
        .query_map([], |row| {
            let raw_tag: String = row.get(0)?;
            Ok(TagName::new_unchecked(&raw_tag))
        })?
        .map(|maybe_tag| maybe_tag.map_err(Error::SqlError))
        .collect()
}
