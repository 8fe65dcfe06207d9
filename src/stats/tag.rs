//! Per-tag groupings and totals.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    money::sum,
    tag::TagName,
    transaction::{Transaction, TransactionId},
};

/// The transactions carrying one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagTransactions {
    /// The tag.
    pub tag: TagName,
    /// The IDs of every transaction with the tag.
    pub transaction_ids: BTreeSet<TransactionId>,
}

/// Income and expense totals for one tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagInfo {
    /// The sum of the non-negative amounts.
    pub income: Decimal,
    /// The magnitude of the sum of the negative amounts.
    pub expenses: Decimal,
    /// The number of transactions with the tag.
    pub transactions: usize,
}

/// Group transaction IDs by tag, sorted by tag.
///
/// Each transaction is listed once under every tag it carries. Untagged
/// transactions are skipped.
pub fn transactions_by_tag(transactions: &[Transaction]) -> Vec<TagTransactions> {
    let mut groups: BTreeMap<&TagName, BTreeSet<TransactionId>> = BTreeMap::new();

    for transaction in transactions {
        for tag in &transaction.tags {
            groups.entry(tag).or_default().insert(transaction.id);
        }
    }

    groups
        .into_iter()
        .map(|(tag, transaction_ids)| TagTransactions {
            tag: tag.clone(),
            transaction_ids,
        })
        .collect()
}

/// Total the transactions tagged with `tag`, split into income and expenses.
pub fn tag_info(transactions: &[Transaction], tag: &TagName) -> TagInfo {
    let (expenses, income): (Vec<&Transaction>, Vec<&Transaction>) = transactions
        .iter()
        .filter(|transaction| transaction.tags.contains(tag))
        .partition(|transaction| transaction.amount < Decimal::ZERO);

    TagInfo {
        income: sum(income.iter().map(|transaction| transaction.amount)),
        expenses: sum(expenses.iter().map(|transaction| transaction.amount)).abs(),
        transactions: income.len() + expenses.len(),
    }
}

#[cfg(test)]
mod tag_stats_tests {
    use std::{collections::BTreeSet, str::FromStr};

    use rust_decimal::Decimal;
    use time::macros::datetime;

    use super::{TagInfo, tag_info, transactions_by_tag};
    use crate::{
        tag::TagName,
        transaction::test_utils::{transaction, with_tags},
    };

    #[test]
    fn explodes_tags_into_groups() {
        let food = with_tags(
            transaction("-1", datetime!(2024-03-02 00:00 UTC), ""),
            &["food"],
        );
        let both = with_tags(
            transaction("-1", datetime!(2024-03-03 00:00 UTC), ""),
            &["travel", "food"],
        );
        let untagged = transaction("-1", datetime!(2024-03-04 00:00 UTC), "");

        let got = transactions_by_tag(&[food.clone(), both.clone(), untagged]);

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].tag, TagName::new_unchecked("food"));
        assert_eq!(got[0].transaction_ids, BTreeSet::from([food.id, both.id]));
        assert_eq!(got[1].tag, TagName::new_unchecked("travel"));
        assert_eq!(got[1].transaction_ids, BTreeSet::from([both.id]));
    }

    #[test]
    fn splits_income_and_expenses() {
        let transactions = vec![
            with_tags(
                transaction("-30.50", datetime!(2024-03-02 00:00 UTC), ""),
                &["holiday"],
            ),
            with_tags(
                transaction("-9.50", datetime!(2024-03-03 00:00 UTC), ""),
                &["holiday", "food"],
            ),
            with_tags(
                transaction("15.25", datetime!(2024-03-04 00:00 UTC), ""),
                &["holiday"],
            ),
            with_tags(
                transaction("-1000", datetime!(2024-03-05 00:00 UTC), ""),
                &["rent"],
            ),
        ];

        let got = tag_info(&transactions, &TagName::new_unchecked("holiday"));

        assert_eq!(
            got,
            TagInfo {
                income: Decimal::from_str("15.25").unwrap(),
                expenses: Decimal::from_str("40.00").unwrap(),
                transactions: 3,
            }
        );
    }

    #[test]
    fn unknown_tag_is_all_zero() {
        let transactions = vec![transaction("-1", datetime!(2024-03-02 00:00 UTC), "")];

        let got = tag_info(&transactions, &TagName::new_unchecked("nope"));

        assert_eq!(got, TagInfo::default());
    }

    #[test]
    fn serializes_with_pascal_case() {
        let json = serde_json::to_value(TagInfo::default()).unwrap();

        assert_eq!(json["Income"], "0");
        assert_eq!(json["Transactions"], 0);
    }
}
