//! Rule-based building blocks for line-item grammars.

pub mod amounts;
pub mod patterns;

pub use amounts::{format_amount, parse_amount, parse_count};
pub use patterns::*;
