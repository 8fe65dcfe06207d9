use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use ledger_stats::{
    Ledger, LedgerConfig,
    account::{Account, AccountType},
    category::Category,
    transaction::RawTransaction,
};

const EVERYDAY: &str = "everyday";
const SAVINGS: &str = "rainy-day";

/// A utility for creating a test database for the ledger CLI.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// How many days of transactions to generate, counting back from today.
    #[arg(long, default_value_t = 120)]
    days: u32,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let config = LedgerConfig::new(Some(EVERYDAY.to_owned()), Some(SAVINGS.to_owned()))?;
    let ledger = Ledger::open(output_path, config)?;

    println!("Creating accounts and categories...");
    ledger.replace_accounts(&accounts())?;
    ledger.replace_categories(&categories())?;

    println!("Creating transactions...");
    let records = transactions(args.days)?;
    let report = ledger.ingest(&records)?;
    println!(
        "Inserted {} transactions ({} rejected)",
        report.inserted, report.rejected
    );

    println!("Success!");

    Ok(())
}

fn accounts() -> Vec<Account> {
    vec![
        Account {
            id: EVERYDAY.to_owned(),
            display_name: "Spending".to_owned(),
            account_type: AccountType::Transactional,
        },
        Account {
            id: SAVINGS.to_owned(),
            display_name: "Rainy Day".to_owned(),
            account_type: AccountType::Savings,
        },
    ]
}

fn categories() -> Vec<Category> {
    let category = |id: &str, name: &str, parent_id: Option<&str>| Category {
        id: id.to_owned(),
        name: name.to_owned(),
        parent_id: parent_id.map(str::to_owned),
    };

    vec![
        category("good-life", "Good Life", None),
        category("restaurants-and-cafes", "Restaurants & Cafes", Some("good-life")),
        category("hobbies", "Hobbies", Some("good-life")),
        category("home", "Home", None),
        category("groceries", "Groceries", Some("home")),
        category("rent", "Rent", Some("home")),
        category("transport", "Transport", None),
        category("fuel", "Fuel", Some("transport")),
    ]
}

/// The spending pattern that repeats through the generated days.
const PATTERN: [(&str, &str, Option<&str>, &[&str]); 5] = [
    ("-4.50", "Coffee", Some("restaurants-and-cafes"), &[]),
    ("-82.35", "Supermarket", Some("groceries"), &["food"]),
    ("-55.00", "Petrol Station", Some("fuel"), &[]),
    ("-420.00", "Rent Payment", Some("rent"), &[]),
    ("-23.90", "Record Store", Some("hobbies"), &["music"]),
];

fn transactions(days: u32) -> Result<Vec<RawTransaction>, Box<dyn Error>> {
    let today = OffsetDateTime::now_utc();
    let mut records = Vec::new();

    for day in 0..days {
        let created_at = (today - Duration::days(i64::from(day))).format(&Rfc3339)?;
        let (amount, description, category_id, tags) = PATTERN[day as usize % PATTERN.len()];

        records.push(record(amount, description, category_id, tags, &created_at, true));

        if day % 14 == 0 {
            records.push(record("2450.00", "Salary", None, &[], &created_at, true));
            records.push(record(
                "-300.00",
                "Transfer to Rainy Day",
                None,
                &[],
                &created_at,
                false,
            ));
        }
    }

    Ok(records)
}

fn record(
    amount: &str,
    description: &str,
    category_id: Option<&str>,
    tags: &[&str],
    created_at: &str,
    is_categorizable: bool,
) -> RawTransaction {
    RawTransaction {
        id: Uuid::new_v4().to_string(),
        description: description.to_owned(),
        raw_text: Some(description.to_uppercase()),
        amount: amount.to_owned(),
        created_at: created_at.to_owned(),
        settled_at: Some(created_at.to_owned()),
        is_categorizable,
        account_id: EVERYDAY.to_owned(),
        category_id: category_id.map(str::to_owned),
        status: "SETTLED".to_owned(),
        tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
    }
}
