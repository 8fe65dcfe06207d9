//! Core category domain types and the category lookup used by aggregations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Error;

/// The bank's identifier for a category, e.g. "restaurants-and-cafes".
pub type CategoryId = String;

/// The label used for transactions that have no category.
pub const UNCATEGORISED: &str = "uncategorised";

/// A spending category.
///
/// Categories form a two level tree: parent categories have no `parent_id`
/// and every child category points at a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// The bank's ID for the category.
    pub id: CategoryId,
    /// The display name of the category.
    pub name: String,
    /// The parent category, `None` for parent categories.
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

impl Category {
    /// Whether this is a top level category.
    pub fn is_parent(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Which level of the category tree to group or list by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    /// The category a transaction was assigned.
    Child,
    /// The parent of the category a transaction was assigned.
    Parent,
}

/// A category as an option in a picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOption {
    /// The display name.
    pub name: String,
    /// The category ID.
    pub value: CategoryId,
}

/// Check that `categories` describe a parent/child tree.
///
/// # Errors
/// Returns an [Error::InvalidCategoryTree] if a category ID or name is blank,
/// a category ID is repeated, a child refers to a category that is not in
/// `categories`, or a child refers to another child (which also rules out
/// cycles).
pub fn validate_category_tree(categories: &[Category]) -> Result<(), Error> {
    let mut by_id: HashMap<&str, &Category> = HashMap::with_capacity(categories.len());

    for category in categories {
        if category.id.trim().is_empty() || category.name.trim().is_empty() {
            return Err(Error::InvalidCategoryTree(format!(
                "the category \"{}\" has a blank ID or name",
                category.id
            )));
        }

        if by_id.insert(category.id.as_str(), category).is_some() {
            return Err(Error::InvalidCategoryTree(format!(
                "the category \"{}\" is listed more than once",
                category.id
            )));
        }
    }

    for category in categories {
        let Some(parent_id) = &category.parent_id else {
            continue;
        };

        match by_id.get(parent_id.as_str()) {
            None => {
                return Err(Error::InvalidCategoryTree(format!(
                    "the parent \"{parent_id}\" of \"{}\" does not exist",
                    category.id
                )));
            }
            Some(parent) if !parent.is_parent() => {
                return Err(Error::InvalidCategoryTree(format!(
                    "the parent \"{parent_id}\" of \"{}\" is itself a child category",
                    category.id
                )));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// An in-memory lookup from category IDs to names.
///
/// Built once per query from the category table so that grouping stages can
/// resolve labels without touching the database.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    categories: HashMap<CategoryId, Category>,
}

impl CategoryIndex {
    /// Build an index over `categories`.
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|category| (category.id.clone(), category))
                .collect(),
        }
    }

    /// Get the category with `id`.
    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    /// The display name of the category with `category_id`.
    ///
    /// Transactions without a category resolve to [UNCATEGORISED].
    ///
    /// # Errors
    /// Returns an [Error::UnresolvedCategory] if `category_id` is not in the
    /// index or its name is blank.
    pub fn category_name(&self, category_id: Option<&str>) -> Result<String, Error> {
        match category_id {
            None => Ok(UNCATEGORISED.to_owned()),
            Some(id) => self
                .get(id)
                .ok_or_else(|| Error::UnresolvedCategory(id.to_owned()))
                .and_then(display_name),
        }
    }

    /// The display name of the parent of the category with `category_id`.
    ///
    /// A parent category is its own parent, and transactions without a
    /// category resolve to [UNCATEGORISED].
    ///
    /// # Errors
    /// Returns an [Error::UnresolvedCategory] if the category or its parent is
    /// not in the index.
    pub fn parent_name(&self, category_id: Option<&str>) -> Result<String, Error> {
        let Some(id) = category_id else {
            return Ok(UNCATEGORISED.to_owned());
        };

        let category = self
            .get(id)
            .ok_or_else(|| Error::UnresolvedCategory(id.to_owned()))?;

        match &category.parent_id {
            None => display_name(category),
            Some(parent_id) => self.category_name(Some(parent_id)),
        }
    }

    /// The label to group a transaction with `category_id` under for `kind`.
    ///
    /// # Errors
    /// Returns an [Error::UnresolvedCategory] if the category cannot be resolved.
    pub fn label(&self, category_id: Option<&str>, kind: CategoryKind) -> Result<String, Error> {
        match kind {
            CategoryKind::Child => self.category_name(category_id),
            CategoryKind::Parent => self.parent_name(category_id),
        }
    }
}

/// Labels are used as group keys, so a blank name never resolves.
fn display_name(category: &Category) -> Result<String, Error> {
    if category.name.trim().is_empty() {
        return Err(Error::UnresolvedCategory(category.id.clone()));
    }

    Ok(category.name.clone())
}

#[cfg(test)]
mod validate_category_tree_tests {
    use super::{Category, validate_category_tree};
    use crate::Error;

    fn category(id: &str, parent_id: Option<&str>) -> Category {
        Category {
            id: id.to_owned(),
            name: id.to_uppercase(),
            parent_id: parent_id.map(str::to_owned),
        }
    }

    #[test]
    fn accepts_two_level_tree() {
        let categories = vec![
            category("food", None),
            category("groceries", Some("food")),
            category("takeaway", Some("food")),
        ];

        assert_eq!(validate_category_tree(&categories), Ok(()));
    }

    #[test]
    fn rejects_missing_parent() {
        let categories = vec![category("groceries", Some("food"))];

        assert!(matches!(
            validate_category_tree(&categories),
            Err(Error::InvalidCategoryTree(_))
        ));
    }

    #[test]
    fn rejects_grandchildren() {
        let categories = vec![
            category("food", None),
            category("groceries", Some("food")),
            category("fruit", Some("groceries")),
        ];

        assert!(matches!(
            validate_category_tree(&categories),
            Err(Error::InvalidCategoryTree(_))
        ));
    }

    #[test]
    fn rejects_cycles() {
        let categories = vec![category("a", Some("b")), category("b", Some("a"))];

        assert!(matches!(
            validate_category_tree(&categories),
            Err(Error::InvalidCategoryTree(_))
        ));
    }

    #[test]
    fn rejects_blank_names() {
        let mut blank = category("food", None);
        blank.name = "  ".to_owned();

        assert!(matches!(
            validate_category_tree(&[blank]),
            Err(Error::InvalidCategoryTree(_))
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let categories = vec![category("food", None), category("food", None)];

        assert!(matches!(
            validate_category_tree(&categories),
            Err(Error::InvalidCategoryTree(_))
        ));
    }
}

#[cfg(test)]
mod category_index_tests {
    use super::{Category, CategoryIndex, CategoryKind, UNCATEGORISED};
    use crate::Error;

    fn get_index() -> CategoryIndex {
        CategoryIndex::new(vec![
            Category {
                id: "good-life".to_owned(),
                name: "Good Life".to_owned(),
                parent_id: None,
            },
            Category {
                id: "restaurants-and-cafes".to_owned(),
                name: "Restaurants & Cafes".to_owned(),
                parent_id: Some("good-life".to_owned()),
            },
        ])
    }

    #[test]
    fn missing_category_is_uncategorised() {
        let index = get_index();

        assert_eq!(index.label(None, CategoryKind::Child), Ok(UNCATEGORISED.to_owned()));
        assert_eq!(index.label(None, CategoryKind::Parent), Ok(UNCATEGORISED.to_owned()));
    }

    #[test]
    fn resolves_child_and_parent_names() {
        let index = get_index();
        let id = Some("restaurants-and-cafes");

        assert_eq!(index.label(id, CategoryKind::Child), Ok("Restaurants & Cafes".to_owned()));
        assert_eq!(index.label(id, CategoryKind::Parent), Ok("Good Life".to_owned()));
    }

    #[test]
    fn parent_category_is_its_own_parent() {
        let index = get_index();

        assert_eq!(index.parent_name(Some("good-life")), Ok("Good Life".to_owned()));
    }

    #[test]
    fn unknown_category_fails_closed() {
        let index = get_index();

        assert_eq!(
            index.label(Some("nope"), CategoryKind::Child),
            Err(Error::UnresolvedCategory("nope".to_owned()))
        );
    }

    #[test]
    fn blank_name_fails_closed() {
        let index = CategoryIndex::new(vec![Category {
            id: "x".to_owned(),
            name: String::new(),
            parent_id: None,
        }]);

        assert_eq!(
            index.label(Some("x"), CategoryKind::Child),
            Err(Error::UnresolvedCategory("x".to_owned()))
        );
        assert_eq!(
            index.label(Some("x"), CategoryKind::Parent),
            Err(Error::UnresolvedCategory("x".to_owned()))
        );
    }
}
