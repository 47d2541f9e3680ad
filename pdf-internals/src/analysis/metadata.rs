//! Document information dictionary.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;

use crate::backend::{DocumentBackend, PdfObject};
use crate::error::BackendResult;

/// Standard /Info keys and their display labels, in display order.
pub const STANDARD_FIELDS: [(&str, &str); 9] = [
    ("Title", "Title"),
    ("Author", "Author"),
    ("Subject", "Subject"),
    ("Creator", "Creator"),
    ("Producer", "Producer"),
    ("CreationDate", "Creation Date"),
    ("ModDate", "Modification Date"),
    ("Keywords", "Keywords"),
    ("Trapped", "Trapped"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub file_size: Option<u64>,
    pub page_count: usize,
    pub version: Option<String>,
    pub encrypted: bool,
    /// Standard fields present in the document, by display label
    pub fields: IndexMap<String, String>,
    /// Every other /Info entry, by key
    pub custom: IndexMap<String, String>,
}

impl DocumentMetadata {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.custom.is_empty()
    }

    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields.get(label).map(String::as_str)
    }
}

/// Render a PDF date (`D:YYYYMMDDHHmmSS...`) as `YYYY-MM-DD HH:MM:SS`.
///
/// Anything that does not parse is returned unchanged.
pub fn format_pdf_date(value: &str) -> String {
    let digits = value.strip_prefix("D:").unwrap_or(value);
    let head: String = digits.chars().take(14).collect();
    match NaiveDateTime::parse_from_str(&head, "%Y%m%d%H%M%S") {
        Ok(date) => date.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => value.to_string(),
    }
}

fn display_value(value: &PdfObject) -> String {
    value
        .as_text()
        .unwrap_or_else(|| format!("<{}>", value.type_name()))
}

pub fn collect_metadata(document: &dyn DocumentBackend) -> BackendResult<DocumentMetadata> {
    let info = document.document_info()?;
    let mut metadata = DocumentMetadata {
        page_count: document.page_count(),
        version: info.version,
        encrypted: info.encrypted,
        ..DocumentMetadata::default()
    };

    for (key, label) in STANDARD_FIELDS {
        let Some(value) = info.info.get(key) else {
            continue;
        };
        let mut text = display_value(value);
        if text.is_empty() {
            continue;
        }
        if key.ends_with("Date") {
            text = format_pdf_date(&text);
        }
        metadata.fields.insert(label.to_string(), text);
    }

    for (key, value) in info.info.iter() {
        if STANDARD_FIELDS.iter().any(|(standard, _)| *standard == key) {
            continue;
        }
        metadata.custom.insert(key.to_string(), display_value(value));
    }

    Ok(metadata)
}
