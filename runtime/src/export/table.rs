//! Header discovery and row extraction from the export's first table.

use super::color::split_cell;
use super::normalize::normalize_fragments;
use super::record::ParsedRecord;
use crate::error::ParseError;
use scraper::{ElementRef, Html, Selector};

/// Labels that identify the header row.
pub const HEADER_KEYWORDS: [&str; 2] = ["지점", "고객명"];
/// Column every valid row must fill.
pub const CUSTOMER_LABEL: &str = "고객명";
/// Literal the export writes into empty customer cells.
pub const PLACEHOLDER: &str = "None";
/// Appears in legend/footer rows that otherwise look like data.
pub const LEAKAGE_MARKER: &str = "담당자";
/// Only this many leading rows are searched for the header.
pub const HEADER_SCAN_ROWS: usize = 10;

/// The rental items column, tolerant of spacing variants ("대여 상품").
pub fn is_rental_items_label(label: &str) -> bool {
    label.contains("대여") && label.contains("상품")
}

/// Row validation on the customer name.
pub fn is_valid_customer(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name != PLACEHOLDER && !name.contains(LEAKAGE_MARKER)
}

struct Selectors {
    table: Selector,
    row: Selector,
    cell: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            table: Selector::parse("table").expect("table selector is valid"),
            row: Selector::parse("tr").expect("row selector is valid"),
            cell: Selector::parse("td, th").expect("cell selector is valid"),
        }
    }
}

/// Text of a header cell: trimmed pieces concatenated, NBSP removed.
fn header_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .map(str::trim)
        .collect::<String>()
        .replace('\u{a0}', "")
}

/// Extract validated records from export HTML, stamping each with `date`.
pub fn extract_records(html: &str, date: &str) -> Result<Vec<ParsedRecord>, ParseError> {
    let sel = Selectors::new();
    let document = Html::parse_document(html);
    let table = document.select(&sel.table).next().ok_or(ParseError::NoTable)?;
    let rows: Vec<ElementRef<'_>> = table.select(&sel.row).collect();

    let labels_of = |row: &ElementRef<'_>| -> Vec<String> {
        row.select(&sel.cell).map(header_text).collect()
    };

    let (headers, data_start) = rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .map(|(idx, row)| (idx, labels_of(row)))
        .find(|(_, labels)| {
            labels
                .iter()
                .any(|l| HEADER_KEYWORDS.contains(&l.as_str()))
        })
        .map(|(idx, labels)| (labels, idx + 1))
        .unwrap_or_else(|| (rows.first().map(labels_of).unwrap_or_default(), 1));

    tracing::debug!("header row: {headers:?}");

    let mut records = Vec::new();
    for row in rows.iter().skip(data_start) {
        let record = extract_row(*row, &headers, &sel.cell);
        let customer = record.get(CUSTOMER_LABEL).unwrap_or_default();
        if is_valid_customer(customer) {
            let mut record = record;
            record.rental_date = date.to_string();
            records.push(record);
        }
    }
    Ok(records)
}

fn extract_row(row: ElementRef<'_>, headers: &[String], cell_sel: &Selector) -> ParsedRecord {
    let mut record = ParsedRecord::new();
    for (idx, (cell, label)) in row.select(cell_sel).zip(headers).enumerate() {
        if is_rental_items_label(label) {
            let (base, addon) = split_cell(cell);
            record.base_products = base;
            record.addon_products = addon;
            continue;
        }
        let label = if label.is_empty() {
            format!("Col_{idx}")
        } else {
            label.clone()
        };
        record.set(&label, normalize_fragments(cell.text()));
    }
    record
}
