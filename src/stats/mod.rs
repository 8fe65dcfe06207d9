//! The aggregation stages behind every analytical query.
//!
//! Each stage is a pure function over already loaded transactions, so the
//! façade chains them explicitly: load → filter → bucket → group → aggregate.

mod balance;
mod category;
mod filter;
mod period;
mod tag;

pub use balance::{BalancePoint, account_balance};
pub use category::{CategoryStat, category_stats};
pub use filter::{TRANSFER_PREFIXES, categorizable, exclude_transfers, is_transfer};
pub use period::{
    CategoryAmount, CategoryPeriodStat, MonthlyStat, category_by_period, month_bucket,
    monthly_stats,
};
pub use tag::{TagInfo, TagTransactions, tag_info, transactions_by_tag};
