//! Line grammars: each turns one normalized line into a row, or rejects it.

use regex::Regex;

use super::rules::{parse_amount, parse_count, ROW_PATTERN};
use crate::error::InvtabError;
use crate::models::invoice::RowRecord;

/// Named groups a custom pattern must define.
pub const REQUIRED_GROUPS: [&str; 5] = ["sno", "description", "qty", "price", "total"];

/// A positional grammar for invoice line items.
pub trait LineGrammar: Send + Sync {
    /// Grammar name for logs.
    fn name(&self) -> &str;

    /// Parse a whole normalized line. Partial matches must be rejected.
    fn parse_line(&self, line: &str) -> Option<RowRecord>;
}

/// The built-in grammar: `<S.No> <description> <qty> <unit price> <total>`.
///
/// The description is the shortest span that still lets the three trailing
/// numeric fields reach the end of the line.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiveColumnGrammar;

impl LineGrammar for FiveColumnGrammar {
    fn name(&self) -> &str {
        "five-column"
    }

    fn parse_line(&self, line: &str) -> Option<RowRecord> {
        let caps = ROW_PATTERN.captures(line)?;
        build_record(&caps[1], &caps[2], &caps[3], &caps[4], &caps[5])
    }
}

/// A user-supplied grammar using named capture groups.
///
/// The pattern is wrapped in `^(?:...)$`, so it always has to match the
/// entire line even when written unanchored.
#[derive(Debug, Clone)]
pub struct PatternGrammar {
    name: String,
    pattern: Regex,
}

impl PatternGrammar {
    /// Compile `pattern`, checking that every required group is present.
    pub fn new(pattern: &str) -> Result<Self, InvtabError> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| InvtabError::Config(format!("invalid row pattern: {}", e)))?;

        let names: Vec<&str> = regex.capture_names().flatten().collect();
        let missing: Vec<&str> = REQUIRED_GROUPS
            .iter()
            .copied()
            .filter(|g| !names.contains(g))
            .collect();

        if !missing.is_empty() {
            return Err(InvtabError::Config(format!(
                "row pattern {:?} is missing named groups: {}",
                pattern,
                missing.join(", ")
            )));
        }

        Ok(Self {
            name: format!("pattern:{}", pattern),
            pattern: regex,
        })
    }
}

impl LineGrammar for PatternGrammar {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse_line(&self, line: &str) -> Option<RowRecord> {
        let caps = self.pattern.captures(line)?;
        build_record(
            caps.name("sno")?.as_str(),
            caps.name("description")?.as_str(),
            caps.name("qty")?.as_str(),
            caps.name("price")?.as_str(),
            caps.name("total")?.as_str(),
        )
    }
}

/// Convert captured fields into a typed row. Any failed conversion rejects
/// the whole line.
fn build_record(sno: &str, description: &str, qty: &str, price: &str, total: &str) -> Option<RowRecord> {
    let description = description.trim();
    if description.is_empty() {
        return None;
    }

    Some(RowRecord {
        serial: parse_count(sno)?,
        description: description.to_string(),
        quantity: parse_count(qty)?,
        unit_price: parse_amount(price)?,
        total: parse_amount(total)?,
    })
}
