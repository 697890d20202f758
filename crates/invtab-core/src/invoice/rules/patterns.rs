//! Common regex patterns for line-item extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Two or more consecutive whitespace characters (column gaps)
    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s{2,}").unwrap();

    // S.No, description (shortest span), quantity, unit price, total
    pub static ref ROW_PATTERN: Regex = Regex::new(
        r"^([0-9]+)\s+(.*?)\s+([0-9]+)\s+([0-9.,]+)\s+([0-9.,]+)$"
    ).unwrap();
}
