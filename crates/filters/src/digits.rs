//! Numeric text minimization
//!
//! Rewrites float-looking fields with at most 12 significant digits and no
//! trailing zeros, so output can be compared with tools that print floats
//! that way. Integer fields keep their leading zeros unless integer trimming
//! is enabled.

use rowdedup_core::Row;

use crate::filter::RowFilter;
use crate::Result;

/// Format a float the way a shortest-repr decimal printer does:
/// `5.0`, `0.25`, `1e+16`, `1.5e-05`, `nan`, `inf`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{:e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent: i32 = exponent.parse().unwrap_or(0);
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exponent.abs())
            }
            None => formatted,
        };
    }

    let formatted = value.to_string();
    if formatted.contains('.') {
        formatted
    } else {
        format!("{}.0", formatted)
    }
}

/// Significant digits kept by `format_significant`
const SIGNIFICANT_DIGITS: i32 = 12;

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Format a float rounded to 12 significant digits, switching to exponent
/// form outside `[1e-4, 1e12)`: `7.9`, `1000.0`, `1e+12`, `1e-05`.
pub fn format_significant(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return format_float(value);
    }

    // exponent after rounding, so 9.9999999999999 counts as 1e1
    let scientific = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return format_float(value);
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if !(-4..SIGNIFICANT_DIGITS).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs());
    }

    let decimals = (SIGNIFICANT_DIGITS - 1 - exponent) as usize;
    let fixed = format!("{:.*}", decimals, value);
    let fixed = trim_fraction(&fixed);
    if fixed.contains('.') {
        fixed.to_string()
    } else {
        format!("{}.0", fixed)
    }
}

fn parse_float(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Minimize one field.
///
/// - all-digit values: leading zeros removed when `ints_too`, else unchanged
/// - other float-parseable values: `format_significant`; zero becomes empty
///   when `null_zeroes`
/// - anything else: unchanged
pub fn trim_digits(value: &str, ints_too: bool, null_zeroes: bool) -> String {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        if !ints_too {
            return value.to_string();
        }
        let trimmed = value.trim_start_matches('0');
        return if trimmed.is_empty() { "0" } else { trimmed }.to_string();
    }

    match parse_float(value) {
        Some(number) if number == 0.0 => {
            if null_zeroes {
                String::new()
            } else {
                "0.0".to_string()
            }
        }
        Some(number) => format_significant(number),
        None => value.to_string(),
    }
}

/// Applies `trim_digits` to every field of every row
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimDigits {
    pub ints_too: bool,
    pub null_zeroes: bool,
}

impl TrimDigits {
    pub fn new(ints_too: bool, null_zeroes: bool) -> Self {
        Self { ints_too, null_zeroes }
    }
}

impl RowFilter for TrimDigits {
    fn process(&mut self, row: Row, out: &mut Vec<Row>) -> Result<()> {
        out.push(
            row.iter()
                .map(|value| trim_digits(value, self.ints_too, self.null_zeroes))
                .collect(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_floats() {
        assert_eq!(trim_digits("0.0000", false, false), "0.0");
        assert_eq!(trim_digits("1.50", false, false), "1.5");
        assert_eq!(trim_digits("012.340", false, false), "12.34");
        assert_eq!(trim_digits("-3.000", false, false), "-3.0");
        assert_eq!(trim_digits("1e3", false, false), "1000.0");
    }

    #[test]
    fn test_trim_rounds_to_twelve_digits() {
        assert_eq!(trim_digits("7.8999999999999995", false, false), "7.9");
        assert_eq!(trim_digits("1.23456789012345", false, false), "1.23456789012");
        assert_eq!(trim_digits("9.99999999999999", false, false), "10.0");
        assert_eq!(trim_digits("1e12", false, false), "1e+12");
        assert_eq!(trim_digits("0.00001", false, false), "1e-05");
        assert_eq!(trim_digits("0.0001", false, false), "0.0001");
        assert_eq!(trim_digits("123456789012.4", false, false), "123456789012.0");
    }

    #[test]
    fn test_integers_only_with_flag() {
        assert_eq!(trim_digits("069", false, false), "069");
        assert_eq!(trim_digits("069", true, false), "69");
        assert_eq!(trim_digits("000", true, false), "0");
    }

    #[test]
    fn test_non_numeric_untouched() {
        assert_eq!(trim_digits("0x40", true, false), "0x40");
        assert_eq!(trim_digits("abc", true, true), "abc");
        assert_eq!(trim_digits("", true, true), "");
    }

    #[test]
    fn test_null_zeroes() {
        assert_eq!(trim_digits("0.000", false, true), "");
        assert_eq!(trim_digits("-0.0", false, true), "");
        assert_eq!(trim_digits("0.5", false, true), "0.5");
        // integer zero is not a float and is left alone
        assert_eq!(trim_digits("0", false, true), "0");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(5.0), "5.0");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(123456.789), "123456.789");
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_filter_applies_to_every_field() {
        let mut filter = TrimDigits {
            ints_too: true,
            null_zeroes: false,
        };
        let mut out = Vec::new();
        filter
            .process(vec!["007".into(), "2.50".into(), "name".into()], &mut out)
            .unwrap();
        assert_eq!(out[0], vec!["7".to_string(), "2.5".to_string(), "name".to_string()]);
    }
}
