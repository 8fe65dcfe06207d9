//! Spending categories and how transactions resolve to category labels.

mod core;
mod db;

pub use core::{
    Category, CategoryId, CategoryIndex, CategoryKind, CategoryOption, UNCATEGORISED,
    validate_category_tree,
};
pub use db::{
    create_category_table, get_all_categories, get_category, get_category_index,
    get_category_options, replace_categories,
};
