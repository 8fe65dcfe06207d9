//! Defines the account reference data and its database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The opaque identifier the bank uses for an account.
pub type AccountId = String;

/// The kind of bank account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// An everyday account that most spending goes through.
    Transactional,
    /// A savings account.
    Savings,
}

impl AccountType {
    /// The string stored in the database for this account type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transactional => "transactional",
            Self::Savings => "savings",
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transactional" => Ok(Self::Transactional),
            "savings" => Ok(Self::Savings),
            other => Err(Error::MalformedRecord(format!(
                "\"{other}\" is not an account type"
            ))),
        }
    }
}

/// A bank account that transactions belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The bank's ID for the account.
    pub id: AccountId,
    /// The name shown to the user.
    pub display_name: String,
    /// Whether this is a transactional or savings account.
    pub account_type: AccountType,
}

/// Create the account table if it does not exist.
///
/// # Errors
/// Returns an error if there is an unexpected SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            account_type TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Replace all accounts with `accounts`.
///
/// Accounts are reference data that is refreshed wholesale from the bank feed.
/// Transactions are not touched, so a transaction may briefly refer to an
/// account that is no longer listed until the next refresh.
///
/// **Note**: If you want the refresh to be atomic, pass in a transaction for
/// `connection`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn replace_accounts(accounts: &[Account], connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM account", ())?;

    let mut stmt = connection.prepare(
        "INSERT OR REPLACE INTO account (id, display_name, account_type) VALUES (?1, ?2, ?3)",
    )?;

    for account in accounts {
        stmt.execute((
            &account.id,
            &account.display_name,
            account.account_type.as_str(),
        ))?;
    }

    Ok(())
}

/// Retrieve an account by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a known account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_account(id: &str, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare("SELECT id, display_name, account_type FROM account WHERE id = :id")?
        .query_row(&[(":id", &id)], map_row_to_account)
        .map_err(|error| error.into())
}

/// Retrieve all accounts ordered by display name.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn get_all_accounts(connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare("SELECT id, display_name, account_type FROM account ORDER BY display_name ASC")?
        .query_map([], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let display_name = row.get(1)?;
    let raw_account_type: String = row.get(2)?;
    let account_type = AccountType::from_str(&raw_account_type).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(error))
    })?;

    Ok(Account {
        id,
        display_name,
        account_type,
    })
}

#[cfg(test)]
mod create_table_tests {
    use rusqlite::Connection;

    use super::create_account_table;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), create_account_table(&connection));
    }
}
