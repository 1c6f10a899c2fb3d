//! Charset and container detection for export files.
//!
//! Exports are served as `.xls` but are HTML, usually in EUC-KR. Nothing in
//! the file declares the charset reliably, so candidates are tried in order
//! and the decoded text must contain a domain word to be accepted.

use encoding_rs::{Encoding, EUC_KR, UTF_8};

/// Words at least one of which appears in every genuine export.
pub const CONTENT_MARKERS: [&str; 3] = ["고객", "지점", "대여"];

/// Legacy first, then modern. `EUC_KR` is the WHATWG superset (cp949).
pub fn default_encodings() -> Vec<&'static Encoding> {
    vec![EUC_KR, UTF_8]
}

/// Decoded export text and the encoding that produced it.
#[derive(Debug)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
    /// Whether malformed sequences were replaced during decoding.
    pub lossy: bool,
}

/// Decode `bytes` with the first candidate that yields marker content.
///
/// Clean decodes are preferred; a lossy decode is accepted only when no
/// candidate decodes cleanly with markers present.
pub fn decode_export(bytes: &[u8], candidates: &[&'static Encoding]) -> Option<Decoded> {
    let attempts: Vec<Decoded> = candidates
        .iter()
        .map(|enc| {
            let (text, _, lossy) = enc.decode(bytes);
            Decoded {
                text: text.into_owned(),
                encoding: *enc,
                lossy,
            }
        })
        .filter(|d| has_markers(&d.text))
        .collect();

    let pick = attempts.iter().position(|d| !d.lossy).unwrap_or(0);
    attempts.into_iter().nth(pick)
}

fn has_markers(text: &str) -> bool {
    CONTENT_MARKERS.iter().any(|m| text.contains(m))
}

/// What the leading bytes of an export look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    /// OLE2 `.xls` or zipped `.xlsx` container.
    Spreadsheet,
    Unknown,
}

impl ExportFormat {
    pub fn sniff(bytes: &[u8]) -> Self {
        const OLE2: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];
        const ZIP: [u8; 4] = [b'P', b'K', 0x03, 0x04];
        if bytes.starts_with(&OLE2) || bytes.starts_with(&ZIP) {
            return ExportFormat::Spreadsheet;
        }

        let head = &bytes[..bytes.len().min(1024)];
        let head = String::from_utf8_lossy(head).to_ascii_lowercase();
        if ["<!doctype", "<html", "<table", "<meta"]
            .iter()
            .any(|tag| head.contains(tag))
        {
            ExportFormat::Html
        } else {
            ExportFormat::Unknown
        }
    }
}
