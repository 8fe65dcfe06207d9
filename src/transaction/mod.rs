//! Transactions: the canonical record model, the conversion from raw bank
//! feed records, the response projection and the queries that load them.
//!
//! Writes flow raw record → [canonicalize] → store, reads flow
//! store → aggregation → [project].

mod canonical;
mod core;
mod ingest;
mod projection;
mod query;
mod range;

pub use canonical::{RawTransaction, canonicalize};
pub use core::{
    Transaction, TransactionId, TransactionStatus, count_transactions, create_transaction_table,
    from_unix_millis, get_transaction, insert_transaction, map_transaction_row, to_unix_millis,
    transaction_exists, upsert_transaction,
};
pub use ingest::{IngestReport, ingest_batch, upsert_record};
pub use projection::{FilteredTransaction, project, project_all};
pub use query::{
    RangeEnd, SortBy, SortOrder, get_tagged_transactions, get_transactions_in_range,
    get_transactions_with_tag, search_transactions, sort_transactions,
};
pub use range::DateRange;
