//! Row parser: raw text to ordered line items.

use std::borrow::Cow;

use tracing::{debug, trace};

use super::grammar::{FiveColumnGrammar, LineGrammar, PatternGrammar};
use super::rules::WHITESPACE_RUN;
use crate::error::InvtabError;
use crate::models::config::ExtractionConfig;
use crate::models::invoice::{InvoiceTable, RowRecord};

/// Collapse runs of two or more whitespace characters to one space and trim.
pub fn normalize_line(line: &str) -> Cow<'_, str> {
    match WHITESPACE_RUN.replace_all(line, " ") {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
        Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
    }
}

/// Best-effort line-item parser over noisy text.
///
/// Grammars are tried in order and the first one that accepts a line wins.
/// Lines no grammar accepts (headers, footers, prose) are skipped.
pub struct RowParser {
    grammars: Vec<Box<dyn LineGrammar>>,
}

impl RowParser {
    /// Parser with only the built-in five-column grammar.
    pub fn new() -> Self {
        Self::empty().with_grammar(FiveColumnGrammar)
    }

    /// Parser with no grammars; every line is rejected until one is added.
    pub fn empty() -> Self {
        Self {
            grammars: Vec::new(),
        }
    }

    /// Append a grammar at the lowest priority.
    pub fn with_grammar<G: LineGrammar + 'static>(mut self, grammar: G) -> Self {
        self.grammars.push(Box::new(grammar));
        self
    }

    /// Custom patterns from `config` first, then the built-in grammar.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, InvtabError> {
        let mut parser = Self::empty();
        for pattern in &config.extra_patterns {
            parser = parser.with_grammar(PatternGrammar::new(pattern)?);
        }
        Ok(parser.with_grammar(FiveColumnGrammar))
    }

    /// Names of the configured grammars, highest priority first.
    pub fn grammar_names(&self) -> Vec<&str> {
        self.grammars.iter().map(|g| g.name()).collect()
    }

    /// Parse one line, normalizing it first.
    pub fn parse_line(&self, line: &str) -> Option<RowRecord> {
        let normalized = normalize_line(line);
        if normalized.is_empty() {
            return None;
        }

        let row = self.grammars.iter().find_map(|g| {
            let row = g.parse_line(&normalized)?;
            trace!("[{}] matched: {}", g.name(), normalized);
            Some(row)
        });

        if row.is_none() {
            trace!("No grammar matched: {}", normalized);
        }
        row
    }

    /// Parse every line of `text`, keeping matches in source order.
    pub fn parse(&self, text: &str) -> Vec<RowRecord> {
        let mut lines = 0usize;
        let rows: Vec<RowRecord> = text
            .lines()
            .inspect(|_| lines += 1)
            .filter_map(|line| self.parse_line(line))
            .collect();

        debug!("Parsed {} rows from {} lines", rows.len(), lines);
        rows
    }

    /// Parse `text` into a table.
    pub fn parse_table(&self, text: &str) -> InvoiceTable {
        InvoiceTable::new(self.parse(text))
    }
}

impl Default for RowParser {
    fn default() -> Self {
        Self::new()
    }
}
