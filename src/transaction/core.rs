//! Defines the canonical transaction model and its database queries.

use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    Error,
    account::AccountId,
    category::CategoryId,
    tag::{TagName, get_transaction_tags, set_transaction_tags},
};

// ============================================================================
// MODELS
// ============================================================================

/// The bank's unique ID for a transaction.
pub type TransactionId = Uuid;

/// Whether the bank has finished processing a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    /// The money is held but the transaction has not settled yet.
    Held,
    /// The transaction has settled.
    Settled,
}

impl TransactionStatus {
    /// The string used by the bank feed and the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Held => "HELD",
            Self::Settled => "SETTLED",
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HELD" => Ok(Self::Held),
            "SETTLED" => Ok(Self::Settled),
            other => Err(Error::MalformedRecord(format!(
                "\"{other}\" is not a transaction status"
            ))),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// This is the canonical form every aggregation works on. Build one from a
/// raw bank record with [crate::transaction::canonicalize].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The bank's ID for the transaction.
    pub id: TransactionId,
    /// When the transaction was created, in UTC.
    ///
    /// This is the timestamp used for ordering and period bucketing.
    pub created_at: OffsetDateTime,
    /// When the transaction settled, if it has.
    pub settled_at: Option<OffsetDateTime>,
    /// The signed amount: negative amounts are outflows, positive amounts are
    /// inflows.
    pub amount: Decimal,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The unprocessed text the bank received, if any.
    pub raw_text: Option<String>,
    /// The account the transaction belongs to.
    pub account_id: AccountId,
    /// The category of the transaction, `None` if uncategorised.
    pub category_id: Option<CategoryId>,
    /// `false` for internal transfers, which are left out of spending totals.
    pub is_categorizable: bool,
    /// Whether the transaction has settled.
    pub status: TransactionStatus,
    /// User defined tags.
    pub tags: BTreeSet<TagName>,
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// Convert `date_time` to whole milliseconds since the Unix epoch.
pub fn to_unix_millis(date_time: OffsetDateTime) -> i64 {
    date_time.unix_timestamp_nanos().div_euclid(1_000_000) as i64
}

/// Convert milliseconds since the Unix epoch to a UTC timestamp.
///
/// # Errors
/// Returns an error if `millis` is outside the range supported by [time].
pub fn from_unix_millis(millis: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// The columns selected by [map_transaction_row], in order.
pub const TRANSACTION_COLUMNS: &str = "t.id, t.created_at, t.settled_at, t.amount, t.description, \
    t.raw_text, t.account_id, t.category_id, t.is_categorizable, t.status";

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id BLOB PRIMARY KEY,
                created_at INTEGER NOT NULL,
                settled_at INTEGER,
                amount TEXT NOT NULL,
                description TEXT NOT NULL,
                raw_text TEXT,
                account_id TEXT NOT NULL,
                category_id TEXT,
                is_categorizable INTEGER NOT NULL,
                status TEXT NOT NULL
                )",
        (),
    )?;

    // Composite index used by every ranged query.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_created_at \
        ON \"transaction\"(account_id, created_at);",
        (),
    )?;

    Ok(())
}

/// Insert a new transaction and its tags.
///
/// **Note**: If you want the transaction and its tags written atomically, pass
/// in a transaction for `connection`.
///
/// # Errors
/// This function will return a:
/// - [Error::ConflictingInsert] if a transaction with the same ID already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_transaction(transaction: &Transaction, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO \"transaction\" (id, created_at, settled_at, amount, description, raw_text,
            account_id, category_id, is_categorizable, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        (
            transaction.id,
            to_unix_millis(transaction.created_at),
            transaction.settled_at.map(to_unix_millis),
            transaction.amount.to_string(),
            &transaction.description,
            &transaction.raw_text,
            &transaction.account_id,
            &transaction.category_id,
            transaction.is_categorizable,
            transaction.status.as_str(),
        ),
    )?;

    set_transaction_tags(transaction.id, &transaction.tags, connection)
}

/// Insert `transaction`, or overwrite every field of the stored transaction
/// with the same ID, including its tag set.
///
/// Returns `true` if the transaction was newly inserted.
///
/// **Note**: If you want the transaction and its tags written atomically, pass
/// in a transaction for `connection`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn upsert_transaction(
    transaction: &Transaction,
    connection: &Connection,
) -> Result<bool, Error> {
    let existed = transaction_exists(transaction.id, connection)?;

    connection.execute(
        "INSERT INTO \"transaction\" (id, created_at, settled_at, amount, description, raw_text,
            account_id, category_id, is_categorizable, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            created_at = excluded.created_at,
            settled_at = excluded.settled_at,
            amount = excluded.amount,
            description = excluded.description,
            raw_text = excluded.raw_text,
            account_id = excluded.account_id,
            category_id = excluded.category_id,
            is_categorizable = excluded.is_categorizable,
            status = excluded.status",
        (
            transaction.id,
            to_unix_millis(transaction.created_at),
            transaction.settled_at.map(to_unix_millis),
            transaction.amount.to_string(),
            &transaction.description,
            &transaction.raw_text,
            &transaction.account_id,
            &transaction.category_id,
            transaction.is_categorizable,
            transaction.status.as_str(),
        ),
    )?;

    set_transaction_tags(transaction.id, &transaction.tags, connection)?;

    Ok(!existed)
}

/// Whether a transaction with `id` is in the database.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn transaction_exists(id: TransactionId, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM \"transaction\" WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Retrieve a transaction, including its tags, from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let mut transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t WHERE t.id = :id"
        ))?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    transaction.tags = get_transaction_tags(id, connection)?;

    Ok(transaction)
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Map a database row selected with [TRANSACTION_COLUMNS] to a Transaction.
///
/// The tag set is left empty, callers load tags separately.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let created_at = map_timestamp(1, row.get(1)?)?;
    let settled_at = row
        .get::<usize, Option<i64>>(2)?
        .map(|millis| map_timestamp(2, millis))
        .transpose()?;
    let raw_amount: String = row.get(3)?;
    let amount = Decimal::from_str(&raw_amount).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error))
    })?;
    let description = row.get(4)?;
    let raw_text = row.get(5)?;
    let account_id = row.get(6)?;
    let category_id = row.get(7)?;
    let is_categorizable = row.get(8)?;
    let raw_status: String = row.get(9)?;
    let status = TransactionStatus::from_str(&raw_status).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(error))
    })?;

    Ok(Transaction {
        id,
        created_at,
        settled_at,
        amount,
        description,
        raw_text,
        account_id,
        category_id,
        is_categorizable,
        status,
        tags: BTreeSet::new(),
    })
}

fn map_timestamp(column: usize, millis: i64) -> Result<OffsetDateTime, rusqlite::Error> {
    from_unix_millis(millis).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(column, Type::Integer, Box::new(error))
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod test_utils {
    use std::{collections::BTreeSet, str::FromStr};

    use rust_decimal::Decimal;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::{Transaction, TransactionStatus};
    use crate::tag::TagName;

    /// The account ID used by test transactions.
    pub(crate) const TEST_ACCOUNT: &str = "test-account";

    /// A settled, categorizable transaction in [TEST_ACCOUNT] with a random ID.
    pub(crate) fn transaction(
        amount: &str,
        created_at: OffsetDateTime,
        description: &str,
    ) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            created_at,
            settled_at: Some(created_at),
            amount: Decimal::from_str(amount).unwrap(),
            description: description.to_owned(),
            raw_text: None,
            account_id: TEST_ACCOUNT.to_owned(),
            category_id: None,
            is_categorizable: true,
            status: TransactionStatus::Settled,
            tags: BTreeSet::new(),
        }
    }

    pub(crate) fn with_category(mut transaction: Transaction, category_id: &str) -> Transaction {
        transaction.category_id = Some(category_id.to_owned());
        transaction
    }

    pub(crate) fn with_tags(mut transaction: Transaction, tags: &[&str]) -> Transaction {
        transaction.tags = tags.iter().map(|tag| TagName::new_unchecked(tag)).collect();
        transaction
    }
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use super::{
        count_transactions, from_unix_millis, get_transaction, insert_transaction, to_unix_millis,
        upsert_transaction,
        test_utils::{transaction, with_category, with_tags},
    };
    use crate::{Error, db::initialize};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_then_get_round_trips() {
        let conn = get_test_connection();
        let want = with_tags(
            with_category(
                transaction("-12.34", datetime!(2024-03-05 10:00:00.123 UTC), "Coffee"),
                "restaurants-and-cafes",
            ),
            &["coffee", "work"],
        );

        insert_transaction(&want, &conn).unwrap();

        assert_eq!(get_transaction(want.id, &conn), Ok(want));
    }

    #[test]
    fn insert_fails_on_duplicate_id() {
        let conn = get_test_connection();
        let first = transaction("1.00", datetime!(2024-03-05 10:00 UTC), "");
        insert_transaction(&first, &conn).unwrap();

        let result = insert_transaction(&first, &conn);

        assert_eq!(result, Err(Error::ConflictingInsert));
        assert_eq!(count_transactions(&conn), Ok(1));
    }

    #[test]
    fn upsert_overwrites_fields_and_tags() {
        let conn = get_test_connection();
        let original = with_tags(
            transaction("-5.00", datetime!(2024-03-05 10:00 UTC), "Pending"),
            &["old"],
        );
        insert_transaction(&original, &conn).unwrap();

        let mut replacement = with_tags(original.clone(), &["new"]);
        replacement.description = "Settled".to_owned();
        let inserted = upsert_transaction(&replacement, &conn).unwrap();

        assert!(!inserted);
        assert_eq!(get_transaction(original.id, &conn), Ok(replacement));
        assert_eq!(count_transactions(&conn), Ok(1));
    }

    #[test]
    fn upsert_inserts_new_transaction() {
        let conn = get_test_connection();
        let new = transaction("5.00", datetime!(2024-03-05 10:00 UTC), "New");

        let inserted = upsert_transaction(&new, &conn).unwrap();

        assert!(inserted);
        assert_eq!(get_transaction(new.id, &conn), Ok(new));
    }

    #[test]
    fn get_missing_transaction_returns_not_found() {
        let conn = get_test_connection();

        let result = get_transaction(uuid::Uuid::new_v4(), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn unix_millis_round_trip() {
        let date_time = datetime!(1969-12-31 23:59:59.999 UTC);

        assert_eq!(from_unix_millis(to_unix_millis(date_time)), Ok(date_time));
    }
}
