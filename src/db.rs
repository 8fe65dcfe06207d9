//! Database schema set up.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    account::create_account_table, category::create_category_table,
    tag::create_transaction_tag_table, transaction::create_transaction_table,
};

/// Create all of the ledger's tables.
///
/// Tables that already exist are left untouched, so calling this on an
/// existing database is safe.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_transaction_tag_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
