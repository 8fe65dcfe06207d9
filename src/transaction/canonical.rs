//! Converting raw bank feed records into canonical transactions.

use std::{collections::BTreeSet, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
    Error,
    money::parse_amount,
    tag::TagName,
    transaction::{Transaction, TransactionStatus, from_unix_millis, to_unix_millis},
};

/// A transaction record as supplied by the bank feed.
///
/// Every field is kept in its textual form until [canonicalize] validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    /// The bank's transaction ID, a UUID string.
    pub id: String,
    /// A short description of the transaction.
    pub description: String,
    /// The unprocessed text the bank received.
    #[serde(default)]
    pub raw_text: Option<String>,
    /// The signed amount as a decimal string, e.g. "-12.30".
    pub amount: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 settlement timestamp, absent for held transactions.
    #[serde(default)]
    pub settled_at: Option<String>,
    /// `false` for internal transfers.
    pub is_categorizable: bool,
    /// The account the transaction belongs to.
    pub account_id: String,
    /// The category of the transaction, if any.
    #[serde(default)]
    pub category_id: Option<String>,
    /// "HELD" or "SETTLED".
    pub status: String,
    /// User defined tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Validate a raw record and convert it to a [Transaction].
///
/// Timestamps are converted to UTC and truncated to whole milliseconds, the
/// precision they are stored at. The function is pure, so canonicalizing the
/// same record twice gives equal transactions.
///
/// # Errors
/// Returns an [Error::MalformedRecord] if the ID is not a UUID, the amount is
/// not a decimal string, a timestamp is not ISO 8601, the status is unknown,
/// the account ID is empty or a tag is invalid.
pub fn canonicalize(raw: &RawTransaction) -> Result<Transaction, Error> {
    let id = Uuid::from_str(raw.id.trim()).map_err(|error| {
        Error::MalformedRecord(format!("\"{}\" is not a valid UUID: {error}", raw.id))
    })?;

    if raw.account_id.trim().is_empty() {
        return Err(Error::MalformedRecord(format!(
            "transaction {id} has no account ID"
        )));
    }

    let tags = raw
        .tags
        .iter()
        .map(|tag| {
            TagName::new(tag)
                .map_err(|error| Error::MalformedRecord(format!("transaction {id}: {error}")))
        })
        .collect::<Result<BTreeSet<_>, _>>()?;

    Ok(Transaction {
        id,
        created_at: parse_timestamp(&raw.created_at)?,
        settled_at: raw.settled_at.as_deref().map(parse_timestamp).transpose()?,
        amount: parse_amount(&raw.amount)?,
        description: raw.description.clone(),
        raw_text: raw.raw_text.clone(),
        account_id: raw.account_id.clone(),
        category_id: raw.category_id.clone(),
        is_categorizable: raw.is_categorizable,
        status: TransactionStatus::from_str(&raw.status)?,
        tags,
    })
}

fn parse_timestamp(text: &str) -> Result<OffsetDateTime, Error> {
    let parsed = OffsetDateTime::parse(text.trim(), &Rfc3339).map_err(|error| {
        Error::MalformedRecord(format!("\"{text}\" is not an ISO 8601 timestamp: {error}"))
    })?;

    from_unix_millis(to_unix_millis(parsed))
        .map_err(|error| Error::MalformedRecord(format!("\"{text}\" is out of range: {error}")))
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::RawTransaction;

    /// A valid raw record that tests can tweak.
    pub(crate) fn raw_transaction(id: &str, amount: &str, created_at: &str) -> RawTransaction {
        RawTransaction {
            id: id.to_owned(),
            description: "Coffee".to_owned(),
            raw_text: Some("COFFEE CO MELBOURNE".to_owned()),
            amount: amount.to_owned(),
            created_at: created_at.to_owned(),
            settled_at: None,
            is_categorizable: true,
            account_id: "test-account".to_owned(),
            category_id: None,
            status: "HELD".to_owned(),
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod canonicalize_tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use time::macros::datetime;
    use uuid::Uuid;

    use super::{RawTransaction, canonicalize, test_utils::raw_transaction};
    use crate::{Error, transaction::TransactionStatus};

    const ID: &str = "6a3f5c2e-8f47-4a7b-9a4e-3a1c0f2d9b11";

    #[test]
    fn parses_fields() {
        let mut raw = raw_transaction(ID, "-12.30", "2024-03-05T10:15:00+11:00");
        raw.settled_at = Some("2024-03-06T01:00:00Z".to_owned());
        raw.status = "SETTLED".to_owned();
        raw.category_id = Some("groceries".to_owned());
        raw.tags = vec!["food".to_owned()];

        let transaction = canonicalize(&raw).unwrap();

        assert_eq!(transaction.id, Uuid::from_str(ID).unwrap());
        assert_eq!(transaction.amount, Decimal::from_str("-12.30").unwrap());
        assert_eq!(transaction.created_at, datetime!(2024-03-04 23:15 UTC));
        assert_eq!(transaction.settled_at, Some(datetime!(2024-03-06 01:00 UTC)));
        assert_eq!(transaction.status, TransactionStatus::Settled);
        assert_eq!(transaction.category_id.as_deref(), Some("groceries"));
        assert_eq!(transaction.tags.len(), 1);
    }

    #[test]
    fn missing_settled_at_stays_none() {
        let raw = raw_transaction(ID, "1", "2024-03-05T10:15:00Z");

        let transaction = canonicalize(&raw).unwrap();

        assert_eq!(transaction.settled_at, None);
    }

    #[test]
    fn is_idempotent() {
        let raw = raw_transaction(ID, "0.10", "2024-03-05T10:15:00.123456Z");

        assert_eq!(canonicalize(&raw), canonicalize(&raw));
    }

    #[test]
    fn truncates_to_milliseconds() {
        let raw = raw_transaction(ID, "0.10", "2024-03-05T10:15:00.123456Z");

        let transaction = canonicalize(&raw).unwrap();

        assert_eq!(transaction.created_at, datetime!(2024-03-05 10:15:00.123 UTC));
    }

    #[test]
    fn rejects_bad_uuid() {
        let raw = raw_transaction("not-a-uuid", "1.00", "2024-03-05T10:15:00Z");

        assert!(matches!(canonicalize(&raw), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn rejects_bad_amount() {
        for amount in ["", "abc", "1e5", "$5.00", "1,000.00"] {
            let raw = raw_transaction(ID, amount, "2024-03-05T10:15:00Z");

            assert!(
                matches!(canonicalize(&raw), Err(Error::MalformedRecord(_))),
                "amount {amount:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_timestamp() {
        let raw = raw_transaction(ID, "1.00", "05/03/2024");

        assert!(matches!(canonicalize(&raw), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn rejects_unknown_status() {
        let mut raw = raw_transaction(ID, "1.00", "2024-03-05T10:15:00Z");
        raw.status = "PENDING".to_owned();

        assert!(matches!(canonicalize(&raw), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn rejects_long_tag() {
        let mut raw = raw_transaction(ID, "1.00", "2024-03-05T10:15:00Z");
        raw.tags = vec!["x".repeat(31)];

        assert!(matches!(canonicalize(&raw), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn deserializes_bank_feed_json() {
        let json = r#"{
            "id": "6a3f5c2e-8f47-4a7b-9a4e-3a1c0f2d9b11",
            "description": "Salary",
            "rawText": null,
            "amount": "1000.00",
            "createdAt": "2024-03-07T09:00:00+11:00",
            "settledAt": null,
            "isCategorizable": true,
            "accountId": "acc-1",
            "categoryId": null,
            "status": "SETTLED"
        }"#;

        let raw: RawTransaction = serde_json::from_str(json).unwrap();

        assert!(raw.tags.is_empty());
        assert_eq!(
            canonicalize(&raw).unwrap().amount,
            Decimal::from_str("1000.00").unwrap()
        );
    }
}
