//! Invoice line-item data models.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Column headers used by every export format, in field order.
pub const COLUMNS: [&str; 5] = ["S.No", "Item Description", "Quantity", "Unit Price", "Total"];

/// One extracted invoice line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    /// Serial number, the leading token of the source line.
    #[serde(rename = "S.No")]
    pub serial: u64,

    /// Item description, trimmed.
    #[serde(rename = "Item Description")]
    pub description: String,

    /// Quantity.
    #[serde(rename = "Quantity")]
    pub quantity: u64,

    /// Unit price.
    #[serde(rename = "Unit Price")]
    pub unit_price: Decimal,

    /// Line total.
    #[serde(rename = "Total")]
    pub total: Decimal,
}

impl RowRecord {
    /// Check whether `quantity * unit_price` matches the stated total.
    pub fn total_matches(&self) -> bool {
        Decimal::from(self.quantity) * self.unit_price == self.total
    }
}

/// The extraction result: line items in source order.
///
/// Built once per document and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceTable {
    rows: Vec<RowRecord>,
}

impl InvoiceTable {
    /// Wrap rows, keeping their order.
    pub fn new(rows: Vec<RowRecord>) -> Self {
        Self { rows }
    }

    /// Rows in source line order.
    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    /// Iterate over rows.
    pub fn iter(&self) -> std::slice::Iter<'_, RowRecord> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of the Total column.
    pub fn grand_total(&self) -> Decimal {
        self.rows.iter().map(|r| r.total).sum()
    }

    /// Serial numbers that occur more than once, ascending.
    ///
    /// Duplicates are kept in the table as-is; this only reports them.
    pub fn duplicate_serials(&self) -> Vec<u64> {
        let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.serial).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(serial, _)| serial)
            .collect()
    }
}

impl<'a> IntoIterator for &'a InvoiceTable {
    type Item = &'a RowRecord;
    type IntoIter = std::slice::Iter<'a, RowRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
