//! Common Utilities
//!
//! Provides number formatting helpers used across the planner

use tracing::trace;

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Format a number with en-US thousands separators
///
/// At most three fractional digits are kept and trailing zeros are
/// dropped, so `1234567.5` becomes `"1,234,567.5"`.
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.3}", value.abs());
    let (int_digits, frac_digits) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(int_digits.len() + int_digits.len() / 3 + 5);
    if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        grouped.push('-');
    }
    for (i, ch) in int_digits.chars().enumerate() {
        if i > 0 && (int_digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let frac = frac_digits.trim_end_matches('0');
    if !frac.is_empty() {
        grouped.push('.');
        grouped.push_str(frac);
    }

    trace!("Formatted {} as {}", value, grouped);
    grouped
}

/// Format an amount followed by its currency label
pub fn format_amount(value: f64, currency: &str) -> String {
    format!("{} {}", format_grouped(value), currency)
}
