//! Export formats for extracted tables.

use std::path::Path;

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook};

use invtab_core::invoice::rules::format_amount;
use invtab_core::{COLUMNS, Extraction, InvoiceTable};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON: table plus acquisition details
    Json,
    /// CSV with one header row
    Csv,
    /// Excel workbook (requires an output path)
    Xlsx,
    /// Plain text table
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Text => "txt",
        }
    }
}

/// Write `extraction` to `path` in `format`.
pub fn write_file(extraction: &Extraction, format: OutputFormat, path: &Path) -> anyhow::Result<()> {
    match format {
        OutputFormat::Xlsx => write_xlsx(&extraction.table, path),
        _ => {
            std::fs::write(path, render(extraction, format)?)?;
            Ok(())
        }
    }
}

/// Render `extraction` as text. Spreadsheets have no text form.
pub fn render(extraction: &Extraction, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(extraction)?),
        OutputFormat::Csv => format_csv(&extraction.table),
        OutputFormat::Text => Ok(format_text(&extraction.table)),
        OutputFormat::Xlsx => anyhow::bail!("xlsx output needs a file; pass --output"),
    }
}

fn format_csv(table: &InvoiceTable) -> anyhow::Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);

    // Header is written even for an empty table
    wtr.write_record(COLUMNS)?;
    for row in table {
        wtr.serialize(row)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(table: &InvoiceTable) -> String {
    let cells: Vec<[String; 5]> = table
        .iter()
        .map(|r| {
            [
                r.serial.to_string(),
                r.description.clone(),
                r.quantity.to_string(),
                format_amount(r.unit_price),
                format_amount(r.total),
            ]
        })
        .collect();

    let mut widths = COLUMNS.map(|c| c.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    push_line(&mut output, &COLUMNS.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&rule.join("  "));
    output.push('\n');
    for row in &cells {
        push_line(&mut output, row, &widths);
    }

    output.push('\n');
    output.push_str(&format!(
        "{} rows, grand total {}\n",
        table.len(),
        format_amount(table.grand_total())
    ));
    output
}

/// Description is left-aligned, everything else right-aligned.
fn push_line(output: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, width))| {
            if i == 1 {
                format!("{:<width$}", cell, width = width)
            } else {
                format!("{:>width$}", cell, width = width)
            }
        })
        .collect();
    output.push_str(padded.join("  ").trim_end());
    output.push('\n');
}

fn write_xlsx(table: &InvoiceTable, path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Line Items")?;

    let bold = Format::new().set_bold();
    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }

    for (i, row) in table.iter().enumerate() {
        let r = u32::try_from(i + 1)?;
        // Excel stores numbers as f64
        worksheet.write_number(r, 0, row.serial as f64)?;
        worksheet.write_string(r, 1, &row.description)?;
        worksheet.write_number(r, 2, row.quantity as f64)?;
        worksheet.write_number(r, 3, row.unit_price.to_f64().unwrap_or_default())?;
        worksheet.write_number(r, 4, row.total.to_f64().unwrap_or_default())?;
    }

    workbook.save(path)?;
    Ok(())
}
