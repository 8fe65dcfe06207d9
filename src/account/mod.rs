//! Bank accounts that transactions belong to.

mod core;

pub use core::{
    Account, AccountId, AccountType, create_account_table, get_account, get_all_accounts,
    replace_accounts,
};
