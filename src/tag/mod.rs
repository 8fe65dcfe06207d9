//! Tags that users attach to transactions.

mod db;
mod domain;

pub use db::{
    add_tags, create_transaction_tag_table, get_transaction_tags, get_unique_tags, remove_tags,
    set_transaction_tags,
};
pub use domain::{MAX_TAG_LENGTH, TagName};
