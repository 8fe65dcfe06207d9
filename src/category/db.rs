//! Database operations for categories.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    category::{Category, CategoryIndex, CategoryKind, CategoryOption, validate_category_tree},
};

/// Initialize the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            parent_id TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_category_parent_id ON category(parent_id);",
    )?;

    Ok(())
}

/// Replace all categories with `categories`.
///
/// **Note**: If you want the refresh to be atomic, pass in a transaction for
/// `connection`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategoryTree] if `categories` is not a parent/child tree,
///   in which case the table is left untouched,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn replace_categories(categories: &[Category], connection: &Connection) -> Result<(), Error> {
    validate_category_tree(categories)?;

    connection.execute("DELETE FROM category", ())?;

    let mut stmt =
        connection.prepare("INSERT INTO category (id, name, parent_id) VALUES (?1, ?2, ?3)")?;

    for category in categories {
        stmt.execute((&category.id, &category.name, &category.parent_id))?;
    }

    Ok(())
}

/// Retrieve a single category by ID.
pub fn get_category(id: &str, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, parent_id FROM category WHERE id = :id;")?
        .query_row(&[(":id", &id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all categories ordered alphabetically by name.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, parent_id FROM category ORDER BY name ASC;")?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Load every category into a [CategoryIndex].
pub fn get_category_index(connection: &Connection) -> Result<CategoryIndex, Error> {
    get_all_categories(connection).map(CategoryIndex::new)
}

/// List the child or parent categories as picker options, sorted by name.
pub fn get_category_options(
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Vec<CategoryOption>, Error> {
    let query = match kind {
        CategoryKind::Child => {
            "SELECT name, id FROM category WHERE parent_id IS NOT NULL ORDER BY name ASC;"
        }
        CategoryKind::Parent => {
            "SELECT name, id FROM category WHERE parent_id IS NULL ORDER BY name ASC;"
        }
    };

    connection
        .prepare(query)?
        .query_map([], |row| {
            Ok(CategoryOption {
                name: row.get(0)?,
                value: row.get(1)?,
            })
        })?
        .map(|maybe_option| maybe_option.map_err(|error| error.into()))
        .collect()
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;

    use super::{
        create_category_table, get_all_categories, get_category, get_category_options,
        replace_categories,
    };
    use crate::{
        Error,
        category::{Category, CategoryKind, CategoryOption},
    };

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_category_table(&connection).expect("Could not create category table");
        connection
    }

    fn get_test_categories() -> Vec<Category> {
        vec![
            Category {
                id: "home".to_owned(),
                name: "Home".to_owned(),
                parent_id: None,
            },
            Category {
                id: "rent".to_owned(),
                name: "Rent".to_owned(),
                parent_id: Some("home".to_owned()),
            },
            Category {
                id: "groceries".to_owned(),
                name: "Groceries".to_owned(),
                parent_id: Some("home".to_owned()),
            },
        ]
    }

    #[test]
    fn replace_then_get_category() {
        let connection = get_test_db_connection();
        let categories = get_test_categories();

        replace_categories(&categories, &connection).unwrap();

        assert_eq!(get_category("rent", &connection), Ok(categories[1].clone()));
    }

    #[test]
    fn get_missing_category_returns_not_found() {
        let connection = get_test_db_connection();

        assert_eq!(get_category("rent", &connection), Err(Error::NotFound));
    }

    #[test]
    fn invalid_tree_leaves_table_untouched() {
        let connection = get_test_db_connection();
        replace_categories(&get_test_categories(), &connection).unwrap();

        let orphan = Category {
            id: "orphan".to_owned(),
            name: "Orphan".to_owned(),
            parent_id: Some("missing".to_owned()),
        };
        let result = replace_categories(&[orphan], &connection);

        assert!(matches!(result, Err(Error::InvalidCategoryTree(_))));
        assert_eq!(get_all_categories(&connection).unwrap().len(), 3);
    }

    #[test]
    fn child_options_are_sorted_by_name() {
        let connection = get_test_db_connection();
        replace_categories(&get_test_categories(), &connection).unwrap();

        let options = get_category_options(CategoryKind::Child, &connection).unwrap();

        assert_eq!(
            options,
            vec![
                CategoryOption {
                    name: "Groceries".to_owned(),
                    value: "groceries".to_owned()
                },
                CategoryOption {
                    name: "Rent".to_owned(),
                    value: "rent".to_owned()
                },
            ]
        );
    }

    #[test]
    fn parent_options_only_include_parents() {
        let connection = get_test_db_connection();
        replace_categories(&get_test_categories(), &connection).unwrap();

        let options = get_category_options(CategoryKind::Parent, &connection).unwrap();

        assert_eq!(
            options,
            vec![CategoryOption {
                name: "Home".to_owned(),
                value: "home".to_owned()
            }]
        );
    }
}
