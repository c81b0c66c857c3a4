//! Number and date parsing for French invoice layouts.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use super::patterns::DATE_DMY;

/// Parse an amount printed with a decimal comma (`1 234,56`), or with a
/// decimal point when no comma is present.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{00a0}' | '\u{202f}'))
        .collect();
    if compact.is_empty() {
        return None;
    }
    let normalized = if compact.contains(',') {
        compact.replace('.', "").replace(',', ".")
    } else {
        compact
    };
    Decimal::from_str(&normalized).ok()
}

/// Parse a `dd/mm/yyyy` date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let caps = DATE_DMY.captures(raw.trim())?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Round to whole units, ties to even.
pub fn round_units(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
}

/// Round to cents, ties to even.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_decimal_comma() {
        assert_eq!(parse_decimal("25,00"), Some(dec("25")));
        assert_eq!(parse_decimal("1 234,56"), Some(dec("1234.56")));
        assert_eq!(parse_decimal("1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_decimal("1\u{00a0}000,5"), Some(dec("1000.5")));
    }

    #[test]
    fn test_parse_decimal_point_and_invalid() {
        assert_eq!(parse_decimal("0.5"), Some(dec("0.5")));
        assert_eq!(parse_decimal("12"), Some(dec("12")));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("15/03/2024"), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(parse_date(" 01/12/2023 "), NaiveDate::from_ymd_opt(2023, 12, 1));
        assert_eq!(parse_date("31/02/2024"), None);
        assert_eq!(parse_date("2024-03-15"), None);
    }

    #[test]
    fn test_rounding_is_half_even() {
        assert_eq!(round_units(dec("0.5")), dec("0"));
        assert_eq!(round_units(dec("1.5")), dec("2"));
        assert_eq!(round_units(dec("2.6")), dec("3"));
        assert_eq!(round_cents(dec("0.125")), dec("0.12"));
        assert_eq!(round_cents(dec("0.135")), dec("0.14"));
    }
}
