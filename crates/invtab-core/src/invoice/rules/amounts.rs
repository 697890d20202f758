//! Numeric field conversion for line items.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a decimal amount such as "1,200.50", dropping thousands separators.
///
/// Returns `None` for anything that is not a plain non-negative decimal once
/// commas are removed (e.g. "1.2.3", ".", ",").
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}

/// Parse an unsigned integer field (serial number or quantity).
pub fn parse_count(s: &str) -> Option<u64> {
    s.trim().parse().ok()
}

/// Format an amount with two decimals and comma thousands separators.
pub fn format_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", amount);
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let (integer_part, decimal_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::with_capacity(chars.len() + chars.len() / 3);

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }

    format!("{}{}.{}", sign, formatted, decimal_part)
}
