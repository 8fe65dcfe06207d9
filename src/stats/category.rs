//! Per-category spending totals.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    category::{CategoryIndex, CategoryKind},
    stats::filter::categorizable,
    transaction::Transaction,
};

/// The total and number of transactions for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStat {
    /// The category name, or [crate::category::UNCATEGORISED].
    pub category: String,
    /// The magnitude of the signed total.
    pub amount: Decimal,
    /// The number of transactions in the category.
    pub transactions: usize,
}

/// Group the categorizable `transactions` by category and total them.
///
/// `kind` selects whether transactions are grouped under their own category or
/// its parent. When grouping by child category, `parent_id` restricts the
/// result to the children of that parent.
///
/// Amounts are summed with their sign so refunds net out, and only then turned
/// into a magnitude. The result is sorted by transaction count, then amount,
/// both descending, then by name.
///
/// # Errors
/// Returns an [Error::UnresolvedCategory] if a transaction's category is not in
/// `categories`.
pub fn category_stats(
    transactions: &[Transaction],
    categories: &CategoryIndex,
    kind: CategoryKind,
    parent_id: Option<&str>,
) -> Result<Vec<CategoryStat>, Error> {
    let mut totals: HashMap<String, (Decimal, usize)> = HashMap::new();

    for transaction in categorizable(transactions) {
        let category_id = transaction.category_id.as_deref();

        if let (CategoryKind::Child, Some(parent_id)) = (kind, parent_id) {
            let in_parent = category_id
                .and_then(|id| categories.get(id))
                .is_some_and(|category| category.parent_id.as_deref() == Some(parent_id));

            if !in_parent {
                continue;
            }
        }

        let label = categories.label(category_id, kind)?;
        let (amount, count) = totals.entry(label).or_insert((Decimal::ZERO, 0));
        *amount += transaction.amount;
        *count += 1;
    }

    let mut stats: Vec<CategoryStat> = totals
        .into_iter()
        .map(|(category, (amount, transactions))| CategoryStat {
            category,
            amount: amount.abs(),
            transactions,
        })
        .collect();

    stats.sort_by(|a, b| {
        b.transactions
            .cmp(&a.transactions)
            .then_with(|| b.amount.cmp(&a.amount))
            .then_with(|| a.category.cmp(&b.category))
    });

    Ok(stats)
}

#[cfg(test)]
mod category_stats_tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use time::macros::datetime;

    use super::{CategoryStat, category_stats};
    use crate::{
        Error,
        category::{Category, CategoryIndex, CategoryKind, UNCATEGORISED},
        transaction::{
            Transaction,
            test_utils::{transaction, with_category},
        },
    };

    fn categories() -> CategoryIndex {
        let category = |id: &str, name: &str, parent_id: Option<&str>| Category {
            id: id.to_owned(),
            name: name.to_owned(),
            parent_id: parent_id.map(str::to_owned),
        };

        CategoryIndex::new(vec![
            category("good-life", "Good Life", None),
            category("home", "Home", None),
            category("restaurants", "Restaurants", Some("good-life")),
            category("takeaway", "Takeaway", Some("good-life")),
            category("groceries", "Groceries", Some("home")),
        ])
    }

    fn spend(amount: &str, category_id: Option<&str>) -> Transaction {
        let t = transaction(amount, datetime!(2024-03-05 10:00 UTC), "");
        match category_id {
            Some(id) => with_category(t, id),
            None => t,
        }
    }

    fn stat(category: &str, amount: &str, transactions: usize) -> CategoryStat {
        CategoryStat {
            category: category.to_owned(),
            amount: Decimal::from_str(amount).unwrap(),
            transactions,
        }
    }

    #[test]
    fn sums_signed_then_takes_magnitude() {
        let transactions = vec![
            spend("-30.00", Some("groceries")),
            spend("10.00", Some("groceries")),
        ];

        let got =
            category_stats(&transactions, &categories(), CategoryKind::Child, None).unwrap();

        assert_eq!(got, vec![stat("Groceries", "20.00", 2)]);
    }

    #[test]
    fn orders_by_count_then_amount() {
        let transactions = vec![
            spend("-5", Some("restaurants")),
            spend("-5", Some("restaurants")),
            spend("-100", Some("groceries")),
            spend("-50", Some("takeaway")),
        ];

        let got =
            category_stats(&transactions, &categories(), CategoryKind::Child, None).unwrap();

        assert_eq!(
            got,
            vec![
                stat("Restaurants", "10", 2),
                stat("Groceries", "100", 1),
                stat("Takeaway", "50", 1),
            ]
        );
    }

    #[test]
    fn equal_keys_sort_by_name() {
        let transactions = vec![spend("-5", Some("takeaway")), spend("-5", Some("restaurants"))];

        let got =
            category_stats(&transactions, &categories(), CategoryKind::Child, None).unwrap();

        assert_eq!(got[0].category, "Restaurants");
        assert_eq!(got[1].category, "Takeaway");
    }

    #[test]
    fn missing_category_counts_as_uncategorised() {
        let transactions = vec![
            spend("-1", None),
            spend("-2", None),
            spend("-3", Some("groceries")),
        ];

        let got =
            category_stats(&transactions, &categories(), CategoryKind::Child, None).unwrap();

        assert_eq!(got[0], stat(UNCATEGORISED, "3", 2));
    }

    #[test]
    fn groups_by_parent() {
        let transactions = vec![
            spend("-5", Some("restaurants")),
            spend("-7", Some("takeaway")),
            spend("-100", Some("groceries")),
        ];

        let got =
            category_stats(&transactions, &categories(), CategoryKind::Parent, None).unwrap();

        assert_eq!(got, vec![stat("Good Life", "12", 2), stat("Home", "100", 1)]);
    }

    #[test]
    fn restricts_children_to_parent() {
        let transactions = vec![
            spend("-5", Some("restaurants")),
            spend("-100", Some("groceries")),
            spend("-1", None),
        ];

        let got = category_stats(
            &transactions,
            &categories(),
            CategoryKind::Child,
            Some("good-life"),
        )
        .unwrap();

        assert_eq!(got, vec![stat("Restaurants", "5", 1)]);
    }

    #[test]
    fn skips_transactions_that_are_not_categorizable() {
        let mut transfer = spend("-500", Some("groceries"));
        transfer.is_categorizable = false;

        let got = category_stats(&[transfer], &categories(), CategoryKind::Child, None).unwrap();

        assert!(got.is_empty());
    }

    #[test]
    fn unknown_category_fails_closed() {
        let transactions = vec![spend("-1", Some("mystery"))];

        let got = category_stats(&transactions, &categories(), CategoryKind::Child, None);

        assert_eq!(got, Err(Error::UnresolvedCategory("mystery".to_owned())));
    }
}
