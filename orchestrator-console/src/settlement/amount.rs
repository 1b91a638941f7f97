//! Tolerant parsing of form input.
//!
//! Every numeric draft field is always a valid, finite decimal. Input that
//! does not parse becomes zero instead of being rejected.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::str::FromStr;

use super::DraftError;

/// Largest magnitude a single amount field may hold. Larger input is treated
/// as unparseable, which keeps every draft total far below `Decimal::MAX`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Parse a decimal, falling back to zero for empty, non-numeric, non-finite
/// or out-of-range input. Scientific notation (`1e3`) is accepted.
pub fn parse_amount(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(trimmed)
        .ok()
        .or_else(|| {
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .and_then(Decimal::from_f64)
        })
        .filter(|value| value.abs() <= MAX_AMOUNT)
        .unwrap_or(Decimal::ZERO)
}

/// Like [`parse_amount`] but never negative.
pub fn parse_non_negative(raw: &str) -> Decimal {
    parse_amount(raw).max(Decimal::ZERO)
}

/// Parse an entity id. Anything that is not a positive integer means "unset".
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

/// Keep free text exactly as typed. Only an empty value clears the field.
pub fn parse_raw_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Parse an optional free-text field; blank input clears it.
pub fn parse_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Parse a checkbox-style flag. Blank input means unchecked.
pub fn parse_flag(field: &'static str, raw: &str) -> Result<bool, DraftError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        _ => Err(DraftError::InvalidValue {
            field,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_decimals() {
        assert_eq!(parse_amount("1000.50"), Decimal::new(100050, 2));
        assert_eq!(parse_amount(" 42 "), Decimal::new(42, 0));
        assert_eq!(parse_amount("-200"), Decimal::new(-200, 0));
    }

    #[test]
    fn non_numeric_input_becomes_zero() {
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("abc"), Decimal::ZERO);
        assert_eq!(parse_amount("12abc"), Decimal::ZERO);
        assert_eq!(parse_amount("NaN"), Decimal::ZERO);
        assert_eq!(parse_amount("inf"), Decimal::ZERO);
    }

    #[test]
    fn accepts_scientific_notation() {
        assert_eq!(parse_amount("1e3"), Decimal::new(1000, 0));
    }

    #[test]
    fn out_of_range_amounts_become_zero() {
        assert_eq!(parse_amount("1000000000000000"), MAX_AMOUNT);
        assert_eq!(parse_amount("-1000000000000000"), -MAX_AMOUNT);
        assert_eq!(parse_amount("1000000000000000.01"), Decimal::ZERO);
        assert_eq!(parse_amount("79228162514264337593543950335"), Decimal::ZERO);
        assert_eq!(parse_amount("-79228162514264337593543950335"), Decimal::ZERO);
        assert_eq!(parse_amount("1e20"), Decimal::ZERO);
        assert_eq!(parse_amount("1e300"), Decimal::ZERO);
    }

    #[test]
    fn non_negative_clamps() {
        assert_eq!(parse_non_negative("-5"), Decimal::ZERO);
        assert_eq!(parse_non_negative("5"), Decimal::new(5, 0));
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("17"), Some(17));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-3"), None);
        assert_eq!(parse_id("4.5"), None);
        assert_eq!(parse_id(""), None);
    }

    #[test]
    fn flags_accept_checkbox_values() {
        assert_eq!(parse_flag("adminOverride", "on"), Ok(true));
        assert_eq!(parse_flag("adminOverride", ""), Ok(false));
        assert!(parse_flag("adminOverride", "sometimes").is_err());
    }

    #[test]
    fn blank_text_clears() {
        assert_eq!(parse_text("   "), None);
        assert_eq!(parse_text("INV-7 partial"), Some("INV-7 partial".to_string()));
    }
}
