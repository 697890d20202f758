//! Line-item extraction from raw invoice text.

mod grammar;
mod parser;
pub mod rules;

pub use grammar::{FiveColumnGrammar, LineGrammar, PatternGrammar, REQUIRED_GROUPS};
pub use parser::{normalize_line, RowParser};
