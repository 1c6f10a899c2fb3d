//! Offline parsing of a saved export.

use crate::dates::DATE_FORMAT;
use crate::export::ExportParser;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;

pub fn run(file: &Path, date: &str, pretty: bool) -> Result<()> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .with_context(|| format!("invalid date '{date}' (expected YYYY-MM-DD)"))?;
    let records = ExportParser::default().parse_file(file, date)?;
    eprintln!("{} records", records.len());
    super::print_json(&records, pretty)
}
