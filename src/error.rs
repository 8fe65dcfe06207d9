//! Defines the crate level error type.

/// The errors that may occur while ingesting or querying the ledger.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A raw record could not be converted into a canonical transaction.
    ///
    /// Carries a description of the offending field, e.g. the amount string
    /// that is not a valid decimal. During batch ingestion the record is
    /// rejected and the rest of the batch continues.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A date range was unparseable or its start came after its end.
    ///
    /// Queries with an invalid range are rejected before touching the store.
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    /// An account or category ID does not refer to known reference data.
    #[error("unknown reference: {0}")]
    UnknownReference(String),

    /// A transaction with the same ID already exists in the database.
    ///
    /// Batch ingestion counts and skips these instead of failing.
    #[error("a transaction with this ID already exists in the database")]
    ConflictingInsert,

    /// An account mapping required by the query has not been configured.
    ///
    /// This is never defaulted to an empty filter, since an empty account
    /// filter would mix the results of every account.
    #[error("required configuration is missing: {0}")]
    ConfigurationMissing(String),

    /// A required string parameter was empty after trimming.
    #[error("{0} cannot be empty")]
    EmptyParameter(&'static str),

    /// A tag was longer than [crate::tag::MAX_TAG_LENGTH] characters.
    #[error("the tag \"{0}\" is too long")]
    TagTooLong(String),

    /// A transaction refers to a category that is not in the category table.
    ///
    /// Projections and aggregations fail closed instead of emitting an empty
    /// category label.
    #[error("could not resolve the category \"{0}\"")]
    UnresolvedCategory(String),

    /// The category feed does not describe a parent/child tree.
    #[error("invalid category tree: {0}")]
    InvalidCategoryTree(String),

    /// A canonical timezone name could not be found in the timezone database.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    ///
    /// Connectivity and other store failures are passed through unchanged,
    /// the engine never retries.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
                },
                _,
            ) => Error::ConflictingInsert,
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

#[cfg(test)]
mod error_conversion_tests {
    use rusqlite::Connection;

    use super::Error;

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn duplicate_primary_key_maps_to_conflicting_insert() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE foo (id TEXT PRIMARY KEY)", ())
            .unwrap();
        connection
            .execute("INSERT INTO foo (id) VALUES ('a')", ())
            .unwrap();

        let error: Error = connection
            .execute("INSERT INTO foo (id) VALUES ('a')", ())
            .unwrap_err()
            .into();

        assert_eq!(error, Error::ConflictingInsert);
    }
}
