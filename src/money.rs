//! Exact decimal money helpers.
//!
//! Amounts are [Decimal] values everywhere in the crate. They are parsed from
//! the decimal strings supplied by the bank feed, stored as strings, summed in
//! Rust and only turned into text at the very end for display.

use std::{str::FromStr, sync::OnceLock};

use numfmt::{Formatter, Precision};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::Error;

/// Parse a signed decimal amount such as `"-12.30"`.
///
/// # Errors
/// Returns [Error::MalformedRecord] if `amount` is not a plain decimal string.
/// Scientific notation, currency symbols and thousands separators are rejected.
pub fn parse_amount(amount: &str) -> Result<Decimal, Error> {
    let trimmed = amount.trim();

    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+')
    {
        return Err(Error::MalformedRecord(format!(
            "\"{amount}\" is not a valid decimal amount"
        )));
    }

    Decimal::from_str(trimmed).map_err(|error| {
        Error::MalformedRecord(format!(
            "\"{amount}\" is not a valid decimal amount: {error}"
        ))
    })
}

/// Sum `amounts` exactly.
pub fn sum<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().fold(Decimal::ZERO, |total, amount| total + amount)
}

/// Format an amount as a dollar string with thousands separators and cents,
/// e.g. `-$1,234.50`.
///
/// The amount is rounded to cents before it is converted for display, so the
/// exact value only loses precision past the second decimal place.
pub fn format_currency(amount: Decimal) -> String {
    static POSITIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();
    static NEGATIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    if rounded.is_zero() {
        // numfmt renders zero as "0", and tiny negative amounts must not become "-$0.00".
        return "$0.00".to_owned();
    }

    let (formatter, prefix) = if rounded.is_sign_negative() {
        (NEGATIVE_FMT.get_or_init(|| currency_formatter("-$")), "-$")
    } else {
        (POSITIVE_FMT.get_or_init(|| currency_formatter("$")), "$")
    };

    let magnitude = rounded.abs();
    let mut formatted = match (formatter, magnitude.to_f64()) {
        (Some(formatter), Some(number)) => formatter.fmt_string(number),
        _ => format!("{prefix}{magnitude:.2}"),
    };

    // numfmt omits trailing zeros in the cents, e.g. "12.30" is rendered as
    // "12.3", so we pad them back.
    match formatted.split_once('.') {
        Some((_, cents)) if cents.len() < 2 => formatted.push_str(&"0".repeat(2 - cents.len())),
        Some(_) => {}
        None => formatted.push_str(".00"),
    }

    formatted
}

fn currency_formatter(prefix: &str) -> Option<Formatter> {
    match Formatter::currency(prefix) {
        Ok(formatter) => Some(formatter.precision(Precision::Decimals(2))),
        Err(error) => {
            tracing::error!("could not create currency formatter for {prefix:?}: {error}");
            None
        }
    }
}

#[cfg(test)]
mod parse_amount_tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::parse_amount;
    use crate::Error;

    #[test]
    fn parses_negative_amount() {
        assert_eq!(parse_amount("-12.30"), Ok(Decimal::from_str("-12.30").unwrap()));
    }

    #[test]
    fn parses_whole_number() {
        assert_eq!(parse_amount("1000"), Ok(Decimal::from(1000)));
    }

    #[test]
    fn rejects_text() {
        assert!(matches!(parse_amount("twelve"), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn rejects_empty_string() {
        assert!(matches!(parse_amount("  "), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn rejects_scientific_notation() {
        assert!(matches!(parse_amount("1e3"), Err(Error::MalformedRecord(_))));
    }
}
