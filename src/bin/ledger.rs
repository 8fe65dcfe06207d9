use std::{error::Error, fs, num::NonZeroUsize, path::PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use ledger_stats::{
    AccountSelector, CategoryStatsQuery, Ledger, LedgerConfig, TransactionQuery,
    account::Account,
    category::{Category, CategoryKind},
    transaction::{DateRange, RawTransaction, SortBy, SortOrder},
};

/// Ingest bank transactions and query spending statistics.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database.
    #[arg(long, env = "LEDGER_DB_PATH")]
    db_path: PathBuf,

    /// The ID of the everyday transactional account.
    #[arg(long, env = "LEDGER_TRANSACTIONAL_ACCOUNT")]
    transactional_account: Option<String>,

    /// The ID of the savings account.
    #[arg(long, env = "LEDGER_SAVINGS_ACCOUNT")]
    savings_account: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database tables.
    Init,
    /// Ingest a JSON array of raw transactions.
    Ingest {
        /// Path to the JSON file.
        file: PathBuf,
        /// Replace transactions that are already stored instead of skipping them.
        #[arg(long)]
        replace: bool,
    },
    /// List accounts, first replacing them with the contents of `file` if given.
    Accounts { file: Option<PathBuf> },
    /// List categories, first replacing them with the contents of `file` if given.
    Categories {
        file: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Kind::Child)]
        kind: Kind,
    },
    /// Income and expenses per month.
    Monthly(AccountRange),
    /// Spending per category.
    CategoryStats {
        #[command(flatten)]
        account_range: AccountRange,
        #[arg(long, value_enum, default_value_t = Kind::Child)]
        kind: Kind,
        /// Only count children of this parent category.
        #[arg(long)]
        parent: Option<String>,
    },
    /// Spending per category per month.
    CategoryHistory {
        #[command(flatten)]
        account_range: AccountRange,
        #[arg(long, value_enum, default_value_t = Kind::Parent)]
        kind: Kind,
    },
    /// The running balance per day.
    Balance(AccountRange),
    /// Transactions grouped by tag.
    Tags,
    /// Income and expenses for one tag.
    TagInfo { tag: String },
    /// Add tags to a transaction.
    TagAdd { id: Uuid, tags: Vec<String> },
    /// Remove tags from a transaction.
    TagRemove { id: Uuid, tags: Vec<String> },
    /// Find transactions by description, category or tag.
    Search { term: String },
    /// List transactions.
    List {
        #[command(flatten)]
        account_range: AccountRange,
        #[arg(long, value_enum, default_value_t = SortField::Time)]
        sort_by: SortField,
        #[arg(long, value_enum, default_value_t = Direction::Desc)]
        order: Direction,
        #[arg(long)]
        limit: Option<NonZeroUsize>,
    },
    /// List internal transfers on the transactional account.
    Transfers {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Show one transaction.
    Show { id: Uuid },
}

#[derive(ClapArgs, Debug)]
struct AccountRange {
    /// `transactional`, `savings` or an account ID.
    #[arg(long, default_value = "transactional")]
    account: String,
    /// Start of the range, either `YYYY-MM-DD` or an RFC 3339 timestamp.
    #[arg(long)]
    from: String,
    /// End of the range, either `YYYY-MM-DD` or an RFC 3339 timestamp.
    #[arg(long)]
    to: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Child,
    Parent,
}

impl From<Kind> for CategoryKind {
    fn from(value: Kind) -> Self {
        match value {
            Kind::Child => CategoryKind::Child,
            Kind::Parent => CategoryKind::Parent,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortField {
    Time,
    Amount,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Direction {
    Asc,
    Desc,
}

fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();
    let config = LedgerConfig::new(args.transactional_account, args.savings_account)?;
    let ledger = Ledger::open(&args.db_path, config)?;

    tracing::debug!("opened ledger at {:?}", args.db_path);

    match args.command {
        Command::Init => {
            tracing::info!("initialized database at {:?}", args.db_path);
            Ok(())
        }
        Command::Ingest { file, replace } => {
            let records: Vec<RawTransaction> = read_json(&file)?;

            if replace {
                let mut inserted = 0;

                for record in &records {
                    if ledger.upsert(record)? {
                        inserted += 1;
                    }
                }

                tracing::info!(
                    "replaced {} transactions and inserted {inserted}",
                    records.len() - inserted
                );
                Ok(())
            } else {
                print_json(&ledger.ingest(&records)?)
            }
        }
        Command::Accounts { file } => {
            if let Some(file) = file {
                let accounts: Vec<Account> = read_json(&file)?;
                ledger.replace_accounts(&accounts)?;
            }

            print_json(&ledger.accounts()?)
        }
        Command::Categories { file, kind } => {
            if let Some(file) = file {
                let categories: Vec<Category> = read_json(&file)?;
                ledger.replace_categories(&categories)?;
            }

            print_json(&ledger.categories(kind.into())?)
        }
        Command::Monthly(account_range) => {
            let (account, range) = account_range.parse(&ledger)?;
            print_json(&ledger.monthly_stats(range, &account)?)
        }
        Command::CategoryStats {
            account_range,
            kind,
            parent,
        } => {
            let (account, range) = account_range.parse(&ledger)?;
            print_json(&ledger.category_stats(&CategoryStatsQuery {
                account,
                range,
                kind: kind.into(),
                parent_category: parent,
            })?)
        }
        Command::CategoryHistory {
            account_range,
            kind,
        } => {
            let (account, range) = account_range.parse(&ledger)?;
            print_json(&ledger.category_history(range, &account, kind.into())?)
        }
        Command::Balance(account_range) => {
            let (account, range) = account_range.parse(&ledger)?;
            print_json(&ledger.account_balance(range, &account)?)
        }
        Command::Tags => print_json(&ledger.transactions_by_tag()?),
        Command::TagInfo { tag } => print_json(&ledger.tag_info(&tag)?),
        Command::TagAdd { id, tags } => {
            ledger.add_tags(id, &as_strs(&tags))?;
            print_json(&ledger.transaction_by_id(id)?)
        }
        Command::TagRemove { id, tags } => {
            ledger.remove_tags(id, &as_strs(&tags))?;
            print_json(&ledger.transaction_by_id(id)?)
        }
        Command::Search { term } => print_json(&ledger.search(&term)?),
        Command::List {
            account_range,
            sort_by,
            order,
            limit,
        } => {
            let (account, range) = account_range.parse(&ledger)?;
            let sort_by = match sort_by {
                SortField::Time => SortBy::Time,
                SortField::Amount => SortBy::Amount,
            };
            let sort_order = match order {
                Direction::Asc => SortOrder::Ascending,
                Direction::Desc => SortOrder::Descending,
            };

            print_json(&ledger.transactions(&TransactionQuery {
                account,
                range,
                sort_by,
                sort_order,
                limit,
            })?)
        }
        Command::Transfers { from, to } => {
            let range = ledger.parse_range(&from, &to)?;
            print_json(&ledger.transfers(range)?)
        }
        Command::Show { id } => print_json(&ledger.transaction_by_id(id)?),
    }
}

impl AccountRange {
    fn parse(&self, ledger: &Ledger) -> Result<(AccountSelector, DateRange), Box<dyn Error>> {
        let account = match self.account.trim() {
            "transactional" => AccountSelector::Transactional,
            "savings" => AccountSelector::Savings,
            account_id => AccountSelector::Id(account_id.to_owned()),
        };
        let range = ledger.parse_range(&self.from, &self.to)?;

        Ok((account, range))
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;

    Ok(serde_json::from_str(&text)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}

fn as_strs(tags: &[String]) -> Vec<&str> {
    tags.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod cli_tests {
    use clap::Parser;

    use super::{Args, Command};

    #[test]
    fn parses_monthly_command() {
        let args = Args::try_parse_from([
            "ledger",
            "--db-path",
            "ledger.db",
            "--transactional-account",
            "everyday",
            "monthly",
            "--from",
            "2024-01-01",
            "--to",
            "2024-12-31",
        ])
        .unwrap();

        assert_eq!(args.transactional_account.as_deref(), Some("everyday"));
        assert!(matches!(args.command, Command::Monthly(_)));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let result = Args::try_parse_from([
            "ledger", "--db-path", "ledger.db", "list", "--from", "2024-01-01", "--to",
            "2024-12-31", "--limit", "0",
        ]);

        assert!(result.is_err());
    }
}
