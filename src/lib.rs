//! Ledger stats ingests bank transactions from an upstream feed into a local
//! SQLite store and answers analytical queries over them.
//!
//! The queries cover monthly income and expenses, spending by category,
//! category spending over time, account balance history and tag rollups.
//! Money is handled as exact decimals throughout and calendar periods are
//! evaluated in a single reference timezone.
//!
//! All queries go through the [Ledger] façade, which validates parameters and
//! resolves accounts before chaining the aggregation stages in [stats].

#![warn(missing_docs)]

pub mod account;
pub mod category;
mod config;
mod db;
mod error;
mod ledger;
pub mod money;
pub mod stats;
pub mod tag;
pub mod timezone;
pub mod transaction;

pub use config::{AccountSelector, LedgerConfig};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use ledger::{CategoryStatsQuery, Ledger, TransactionQuery};
