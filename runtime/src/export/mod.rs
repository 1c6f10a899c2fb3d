//! Export parsing engine.
//!
//! The schedule application's "Excel download" produces an HTML document
//! with an `.xls` name. This module turns such a file into
//! [`ParsedRecord`]s: charset detection, header discovery, per-column text
//! cleanup, and the color-based split of the rental items column.

pub mod color;
pub mod encoding;
pub mod normalize;
pub mod record;
pub mod table;

pub use record::ParsedRecord;

use crate::error::ParseError;
use chrono::NaiveDate;
use encoding::{decode_export, default_encodings, ExportFormat};
use encoding_rs::Encoding;
use std::path::Path;
use tracing::{info, warn};

/// Parses export files for one date at a time.
#[derive(Debug, Clone)]
pub struct ExportParser {
    encodings: Vec<&'static Encoding>,
}

impl Default for ExportParser {
    fn default() -> Self {
        Self {
            encodings: default_encodings(),
        }
    }
}

impl ExportParser {
    /// Parser trying `encodings` in the given priority order.
    pub fn with_encodings(encodings: Vec<&'static Encoding>) -> Self {
        Self { encodings }
    }

    /// Read and parse an export file.
    pub fn parse_file(&self, path: &Path, date: NaiveDate) -> Result<Vec<ParsedRecord>, ParseError> {
        info!("parsing export {}", path.display());
        let bytes = std::fs::read(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_bytes(&bytes, date)
    }

    /// Parse export bytes. Every format goes through the HTML table path.
    pub fn parse_bytes(&self, bytes: &[u8], date: NaiveDate) -> Result<Vec<ParsedRecord>, ParseError> {
        match ExportFormat::sniff(bytes) {
            ExportFormat::Html => {}
            other => warn!("export does not look like HTML ({other:?}); parsing as HTML anyway"),
        }

        let decoded = decode_export(bytes, &self.encodings).ok_or(ParseError::UnknownEncoding)?;
        info!(
            "export decoded as {}{}",
            decoded.encoding.name(),
            if decoded.lossy { " (lossy)" } else { "" }
        );

        let records = table::extract_records(&decoded.text, &crate::dates::format_date(date))?;
        info!("parsed {} records", records.len());
        Ok(records)
    }
}
