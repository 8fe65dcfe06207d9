//! The query façade: the single validated entry point for every operation.

use std::{
    num::NonZeroUsize,
    ops::Deref,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, get_account, get_all_accounts},
    category::{
        Category, CategoryKind, CategoryOption, get_category, get_category_index,
        get_category_options,
    },
    config::{AccountSelector, LedgerConfig},
    db::initialize,
    stats::{
        BalancePoint, CategoryPeriodStat, CategoryStat, MonthlyStat, TagInfo, TagTransactions,
        account_balance, category_by_period, category_stats, monthly_stats, tag_info,
        transactions_by_tag,
    },
    tag::{self, TagName, get_unique_tags},
    transaction::{
        DateRange, FilteredTransaction, IngestReport, RangeEnd, RawTransaction, SortBy, SortOrder,
        TransactionId, get_tagged_transactions, get_transaction, get_transactions_in_range,
        get_transactions_with_tag, ingest_batch, project, project_all, search_transactions,
        sort_transactions, upsert_record,
    },
};

/// Parameters for listing transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    /// The account to list.
    pub account: AccountSelector,
    /// Transactions created within `[from, to]` are listed.
    pub range: DateRange,
    /// The field to sort by.
    #[serde(default)]
    pub sort_by: SortBy,
    /// The direction to sort in.
    #[serde(default)]
    pub sort_order: SortOrder,
    /// The maximum number of transactions to return.
    #[serde(default)]
    pub limit: Option<NonZeroUsize>,
}

/// Parameters for per-category spending totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStatsQuery {
    /// The account to total.
    pub account: AccountSelector,
    /// Transactions created within `[from, to)` are counted.
    pub range: DateRange,
    /// Group by child or parent category.
    pub kind: CategoryKind,
    /// When grouping by child category, only count children of this parent.
    /// Ignored when grouping by parent category.
    #[serde(default)]
    pub parent_category: Option<String>,
}

/// The single entry point for ingesting and querying the ledger.
///
/// Every operation validates its parameters before touching the store. The
/// façade is the only place that maps account types to account IDs, the
/// aggregation stages only ever see a resolved ID.
///
/// Cloning a ledger is cheap and the clones share the same store.
#[derive(Debug, Clone)]
pub struct Ledger {
    store: Store,
    config: LedgerConfig,
}

/// Where a ledger gets its connections from.
#[derive(Debug, Clone)]
enum Store {
    /// One connection shared behind a lock, e.g. an in-memory database.
    Shared(Arc<Mutex<Connection>>),
    /// A database file opened for each operation, so readers never wait on
    /// each other.
    File(Arc<PathBuf>),
}

/// A connection borrowed from a [Store] for one operation.
enum StoreConnection<'a> {
    Locked(MutexGuard<'a, Connection>),
    Owned(Connection),
}

impl Deref for StoreConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Locked(guard) => &**guard,
            Self::Owned(connection) => connection,
        }
    }
}

/// How long a write waits for another connection's write to finish.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl Ledger {
    /// Create a ledger over `connection`, creating any missing tables.
    ///
    /// Every operation goes through this one connection, one at a time. Use
    /// [Ledger::open] for a database file that serves concurrent readers.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(connection: Connection, config: LedgerConfig) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self {
            store: Store::Shared(Arc::new(Mutex::new(connection))),
            config,
        })
    }

    /// Create a ledger over the database file at `path`, creating the file
    /// and any missing tables.
    ///
    /// Each operation opens its own connection and the database is switched
    /// to write-ahead logging, so queries run concurrently with each other
    /// and with writes.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>, config: LedgerConfig) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let connection = Connection::open(&path)?;
        let journal_mode: String =
            connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        initialize(&connection)?;

        tracing::debug!("opened {path:?} with journal mode {journal_mode}");

        Ok(Self {
            store: Store::File(Arc::new(path)),
            config,
        })
    }

    /// The ledger's configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Parse a date range, expanding plain dates to whole days in the
    /// reference timezone.
    ///
    /// # Errors
    /// Returns an [Error::InvalidRange] if a bound cannot be parsed or `from` is
    /// later than `to`.
    pub fn parse_range(&self, from: &str, to: &str) -> Result<DateRange, Error> {
        DateRange::parse(from, to, self.config.timezone())
    }

    // ------------------------------------------------------------------------
    // Reference data
    // ------------------------------------------------------------------------

    /// Replace every account with `accounts`.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error.
    pub fn replace_accounts(&self, accounts: &[Account]) -> Result<(), Error> {
        let connection = self.connection()?;
        let tx = SqlTransaction::new_unchecked(&connection, TransactionBehavior::Immediate)?;
        crate::account::replace_accounts(accounts, &tx)?;
        tx.commit()?;

        tracing::info!("replaced accounts with {} accounts", accounts.len());

        Ok(())
    }

    /// Replace every category with `categories`.
    ///
    /// # Errors
    /// Returns an [Error::InvalidCategoryTree] if `categories` is not a
    /// parent/child tree, or an [Error::SqlError] if there is an unexpected
    /// SQL error.
    pub fn replace_categories(&self, categories: &[Category]) -> Result<(), Error> {
        let connection = self.connection()?;
        let tx = SqlTransaction::new_unchecked(&connection, TransactionBehavior::Immediate)?;
        crate::category::replace_categories(categories, &tx)?;
        tx.commit()?;

        tracing::info!("replaced categories with {} categories", categories.len());

        Ok(())
    }

    /// List every account, sorted by display name.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error.
    pub fn accounts(&self) -> Result<Vec<Account>, Error> {
        get_all_accounts(&*self.connection()?)
    }

    /// List the child or parent categories as picker options, sorted by name.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error.
    pub fn categories(&self, kind: CategoryKind) -> Result<Vec<CategoryOption>, Error> {
        get_category_options(kind, &*self.connection()?)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Ingest a batch of raw records.
    ///
    /// See [crate::transaction::ingest_batch] for how bad records are handled.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error.
    pub fn ingest(&self, records: &[RawTransaction]) -> Result<IngestReport, Error> {
        ingest_batch(records, &*self.connection()?)
    }

    /// Insert `record`, or replace the stored transaction with the same ID.
    ///
    /// Returns `true` if the transaction was not stored before.
    ///
    /// # Errors
    /// Returns an [Error::MalformedRecord] if the record is invalid, an
    /// [Error::UnknownReference] if its account is unknown, or an
    /// [Error::SqlError] if there is an unexpected SQL error.
    pub fn upsert(&self, record: &RawTransaction) -> Result<bool, Error> {
        upsert_record(record, &*self.connection()?)
    }

    /// Add `tags` to a transaction without touching any other field.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::EmptyParameter] if `tags` is empty or a tag is blank,
    /// - [Error::TagTooLong] if a tag is too long,
    /// - [Error::NotFound] if the transaction does not exist,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn add_tags(&self, id: TransactionId, tags: &[&str]) -> Result<(), Error> {
        let tags = parse_tags(tags)?;
        let connection = self.connection()?;

        tag::add_tags(id, &tags, &connection)
    }

    /// Remove `tags` from a transaction without touching any other field.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::EmptyParameter] if `tags` is empty or a tag is blank,
    /// - [Error::TagTooLong] if a tag is too long,
    /// - [Error::NotFound] if the transaction does not exist,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn remove_tags(&self, id: TransactionId, tags: &[&str]) -> Result<(), Error> {
        let tags = parse_tags(tags)?;
        let connection = self.connection()?;

        tag::remove_tags(id, &tags, &connection)
    }

    // ------------------------------------------------------------------------
    // Rollups
    // ------------------------------------------------------------------------

    /// Income and expense totals per month for transactions created within
    /// `[from, to]`, with internal transfers excluded.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::ConfigurationMissing] if `account` names an unconfigured account,
    /// - [Error::UnknownReference] if the account does not exist,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn monthly_stats(
        &self,
        range: DateRange,
        account: &AccountSelector,
    ) -> Result<Vec<MonthlyStat>, Error> {
        let connection = self.connection()?;
        let account_id = self.resolve_account(account, &connection)?;

        let transactions =
            get_transactions_in_range(account_id, range, RangeEnd::Inclusive, None, &connection)?;

        Ok(monthly_stats(&transactions, self.config.timezone()))
    }

    /// Spending totals per category for categorizable transactions created
    /// within `[from, to)`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::ConfigurationMissing] if the query names an unconfigured account,
    /// - [Error::UnknownReference] if the account does not exist, or when
    ///   grouping by child category, if the parent category does not exist or
    ///   is itself a child category,
    /// - [Error::UnresolvedCategory] if a transaction's category is unknown,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn category_stats(&self, query: &CategoryStatsQuery) -> Result<Vec<CategoryStat>, Error> {
        let connection = self.connection()?;
        let account_id = self.resolve_account(&query.account, &connection)?;

        let parent_category = match query.parent_category.as_deref().map(str::trim) {
            _ if query.kind == CategoryKind::Parent => None,
            None | Some("") => None,
            Some(parent_id) => match get_category(parent_id, &connection) {
                Ok(category) if category.is_parent() => Some(category.id),
                Ok(_) => {
                    return Err(Error::UnknownReference(format!(
                        "\"{parent_id}\" is not a parent category"
                    )));
                }
                Err(Error::NotFound) => {
                    return Err(Error::UnknownReference(format!("category \"{parent_id}\"")));
                }
                Err(error) => return Err(error),
            },
        };

        let categories = get_category_index(&connection)?;
        let transactions = get_transactions_in_range(
            account_id,
            query.range,
            RangeEnd::Exclusive,
            Some(true),
            &connection,
        )?;

        category_stats(
            &transactions,
            &categories,
            query.kind,
            parent_category.as_deref(),
        )
    }

    /// Spending totals per category per month for categorizable transactions
    /// created within `[from, to]`, with internal transfers excluded.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::ConfigurationMissing] if `account` names an unconfigured account,
    /// - [Error::UnknownReference] if the account does not exist,
    /// - [Error::UnresolvedCategory] if a transaction's category is unknown,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn category_history(
        &self,
        range: DateRange,
        account: &AccountSelector,
        kind: CategoryKind,
    ) -> Result<Vec<CategoryPeriodStat>, Error> {
        let connection = self.connection()?;
        let account_id = self.resolve_account(account, &connection)?;

        let categories = get_category_index(&connection)?;
        let transactions = get_transactions_in_range(
            account_id,
            range,
            RangeEnd::Inclusive,
            Some(true),
            &connection,
        )?;

        category_by_period(&transactions, &categories, kind, self.config.timezone())
    }

    /// The running balance per day for transactions created within `[from, to]`.
    ///
    /// The balance starts at zero at the start of the range.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::ConfigurationMissing] if `account` names an unconfigured account,
    /// - [Error::UnknownReference] if the account does not exist,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn account_balance(
        &self,
        range: DateRange,
        account: &AccountSelector,
    ) -> Result<Vec<BalancePoint>, Error> {
        let connection = self.connection()?;
        let account_id = self.resolve_account(account, &connection)?;

        let transactions =
            get_transactions_in_range(account_id, range, RangeEnd::Inclusive, None, &connection)?;

        Ok(account_balance(&transactions, self.config.timezone()))
    }

    // ------------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------------

    /// The IDs of the transactions carrying each tag.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error.
    pub fn transactions_by_tag(&self) -> Result<Vec<TagTransactions>, Error> {
        let transactions = get_tagged_transactions(&*self.connection()?)?;

        Ok(transactions_by_tag(&transactions))
    }

    /// Income and expense totals for the transactions tagged with `tag`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::EmptyParameter] if `tag` is blank,
    /// - [Error::TagTooLong] if `tag` is too long,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn tag_info(&self, tag: &str) -> Result<TagInfo, Error> {
        let tag = TagName::new(tag)?;
        let transactions = get_transactions_with_tag(&tag, &*self.connection()?)?;

        Ok(tag_info(&transactions, &tag))
    }

    /// Every distinct tag, sorted.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an unexpected SQL error.
    pub fn unique_tags(&self) -> Result<Vec<TagName>, Error> {
        get_unique_tags(&*self.connection()?)
    }

    // ------------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------------

    /// List transactions as described by `query`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::ConfigurationMissing] if the query names an unconfigured account,
    /// - [Error::UnknownReference] if the account does not exist,
    /// - [Error::UnresolvedCategory] if a transaction's category is unknown,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<FilteredTransaction>, Error> {
        let connection = self.connection()?;
        let account_id = self.resolve_account(&query.account, &connection)?;

        let mut transactions = get_transactions_in_range(
            account_id,
            query.range,
            RangeEnd::Inclusive,
            None,
            &connection,
        )?;
        sort_transactions(&mut transactions, query.sort_by, query.sort_order);

        if let Some(limit) = query.limit {
            transactions.truncate(limit.get());
        }

        project_all(&transactions, &get_category_index(&connection)?)
    }

    /// List the transactional account's internal transfers created within
    /// `[from, to)`, oldest first.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::ConfigurationMissing] if no transactional account is configured,
    /// - [Error::UnknownReference] if the account does not exist,
    /// - [Error::UnresolvedCategory] if a transaction's category is unknown,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn transfers(&self, range: DateRange) -> Result<Vec<FilteredTransaction>, Error> {
        let connection = self.connection()?;
        let account_id = self.resolve_account(&AccountSelector::Transactional, &connection)?;

        let transactions = get_transactions_in_range(
            account_id,
            range,
            RangeEnd::Exclusive,
            Some(false),
            &connection,
        )?;

        project_all(&transactions, &get_category_index(&connection)?)
    }

    /// Get one transaction.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if there is no transaction with `id`,
    /// - [Error::UnresolvedCategory] if its category is unknown,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn transaction_by_id(&self, id: TransactionId) -> Result<FilteredTransaction, Error> {
        let connection = self.connection()?;
        let transaction = get_transaction(id, &connection)?;

        project(&transaction, &get_category_index(&connection)?)
    }

    /// Find transactions whose description, raw text, category or tags
    /// contain `term`, ignoring case. Newest first.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::EmptyParameter] if `term` is blank,
    /// - [Error::UnresolvedCategory] if a transaction's category is unknown,
    /// - [Error::SqlError] if there is an unexpected SQL error.
    pub fn search(&self, term: &str) -> Result<Vec<FilteredTransaction>, Error> {
        let term = term.trim();

        if term.is_empty() {
            return Err(Error::EmptyParameter("search term"));
        }

        let connection = self.connection()?;
        let transactions = search_transactions(term, &connection)?;

        tracing::debug!("search for {term:?} matched {} transactions", transactions.len());

        project_all(&transactions, &get_category_index(&connection)?)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn connection(&self) -> Result<StoreConnection<'_>, Error> {
        match &self.store {
            Store::Shared(connection) => connection
                .lock()
                .map(StoreConnection::Locked)
                .map_err(|error| {
                    tracing::error!("could not acquire database lock: {error}");
                    Error::DatabaseLockError
                }),
            Store::File(path) => {
                let connection = Connection::open(path.as_path())?;
                connection.busy_timeout(BUSY_TIMEOUT)?;

                Ok(StoreConnection::Owned(connection))
            }
        }
    }

    fn resolve_account<'a>(
        &'a self,
        selector: &'a AccountSelector,
        connection: &Connection,
    ) -> Result<&'a str, Error> {
        let account_id = self.config.resolve(selector)?;

        match get_account(account_id, connection) {
            Ok(_) => {
                tracing::debug!("resolved {selector:?} to account {account_id}");
                Ok(account_id)
            }
            Err(Error::NotFound) => Err(Error::UnknownReference(format!(
                "account \"{account_id}\""
            ))),
            Err(error) => Err(error),
        }
    }
}

fn parse_tags(tags: &[&str]) -> Result<Vec<TagName>, Error> {
    if tags.is_empty() {
        return Err(Error::EmptyParameter("tags"));
    }

    tags.iter().map(|tag| TagName::new(tag)).collect()
}
