//! Single-pass per-page tallies.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use super::tables::detect_tables;
use crate::backend::{DocumentBackend, PdfObject};
use crate::error::UnitFailure;

/// Keys mapped to the pages they occur on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageTally {
    pub entries: IndexMap<String, Vec<usize>>,
    pub errors: Vec<String>,
}

impl PageTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` on `page` once, however often it occurs there.
    pub fn record_unique(&mut self, key: impl Into<String>, page: usize) {
        let pages = self.entries.entry(key.into()).or_default();
        if !pages.contains(&page) {
            pages.push(page);
        }
    }

    /// Record one occurrence of `key` on `page`.
    pub fn record(&mut self, key: impl Into<String>, page: usize) {
        self.entries.entry(key.into()).or_default().push(page);
    }

    pub fn fail(&mut self, failure: UnitFailure) {
        warn!(error = %failure, "Tally unit failed");
        self.errors.push(failure.to_string());
    }

    /// Occurrences across all keys.
    pub fn total(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextSummary {
    pub total_characters: usize,
    pub pages_with_text: Vec<usize>,
    pub errors: Vec<String>,
}

/// Filter name to the number of objects using it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompressionTally {
    pub filters: IndexMap<String, usize>,
    pub errors: Vec<String>,
}

impl CompressionTally {
    /// Filters by descending use, ties by name.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .filters
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// Pixel sizes of placed images, `"<w>x<h>px"`.
pub fn tally_image_sizes(document: &dyn DocumentBackend) -> PageTally {
    let mut tally = PageTally::new();
    for index in 0..document.page_count() {
        let page = index + 1;
        match document.page_images(index) {
            Ok(images) => {
                for image in images {
                    tally.record_unique(
                        format!("{}x{}px", image.pixel_width, image.pixel_height),
                        page,
                    );
                }
            }
            Err(e) => tally.fail(UnitFailure::page(page, e.detail())),
        }
    }
    tally
}

/// Ruled tables, `"<rows>x<cols> cells"`, one occurrence per table.
pub fn tally_tables(document: &dyn DocumentBackend) -> PageTally {
    let mut tally = PageTally::new();
    for index in 0..document.page_count() {
        let page = index + 1;
        match document.page_line_segments(index) {
            Ok(segments) => {
                for table in detect_tables(&segments) {
                    tally.record(format!("{}x{} cells", table.rows, table.cols), page);
                }
            }
            Err(e) => tally.fail(UnitFailure::page(page, e.detail())),
        }
    }
    tally
}

pub fn summarize_text(document: &dyn DocumentBackend) -> TextSummary {
    let mut summary = TextSummary::default();
    for index in 0..document.page_count() {
        let page = index + 1;
        match document.page_text(index) {
            Ok(text) if !text.trim().is_empty() => {
                summary.total_characters += text.chars().count();
                summary.pages_with_text.push(page);
            }
            Ok(_) => {}
            Err(e) => {
                let failure = UnitFailure::page(page, e.detail());
                warn!(error = %failure, "Text extraction failed");
                summary.errors.push(failure.to_string());
            }
        }
    }
    summary
}

/// Annotation /Subtype to pages.
pub fn tally_annotations(document: &dyn DocumentBackend) -> PageTally {
    let mut tally = PageTally::new();
    for index in 0..document.page_count() {
        let page = index + 1;
        let annotations = match document.page_annotations(index) {
            Ok(annotations) => annotations,
            Err(e) => {
                tally.fail(UnitFailure::page(page, e.detail()));
                continue;
            }
        };

        for annotation in annotations {
            match &annotation {
                PdfObject::Dictionary(dict) => {
                    let subtype = dict
                        .get("Subtype")
                        .and_then(PdfObject::as_text)
                        .unwrap_or_else(|| "Unknown".to_string());
                    tally.record_unique(subtype, page);
                }
                PdfObject::Unreadable(message) => {
                    tally.fail(UnitFailure::annotation(page, message));
                }
                other => tally.fail(UnitFailure::annotation(
                    page,
                    format!("expected a dictionary, found {}", other.type_name()),
                )),
            }
        }
    }
    tally
}

/// AcroForm field type (/FT) to the page of each field's widget.
///
/// Fields without a /P reference to a known page are not counted.
pub fn tally_form_fields(document: &dyn DocumentBackend) -> PageTally {
    let mut tally = PageTally::new();
    let fields = match document.form_fields() {
        Ok(fields) => fields,
        Err(e) => {
            tally.fail(UnitFailure::document("AcroForm", e.detail()));
            return tally;
        }
    };

    let page_ids: Vec<_> = (0..document.page_count())
        .map(|index| document.page_object_id(index))
        .collect();

    for field in fields {
        let dict = match &field {
            PdfObject::Dictionary(dict) => dict,
            PdfObject::Unreadable(message) => {
                tally.fail(UnitFailure::document("Form field", message));
                continue;
            }
            other => {
                tally.fail(UnitFailure::document(
                    "Form field",
                    format!("expected a dictionary, found {}", other.type_name()),
                ));
                continue;
            }
        };

        let field_type = dict
            .get("FT")
            .and_then(PdfObject::as_text)
            .unwrap_or_else(|| "Unknown".to_string());
        let page = dict
            .get("P")
            .and_then(PdfObject::object_id)
            .and_then(|id| page_ids.iter().position(|page_id| *page_id == Some(id)));

        if let Some(index) = page {
            tally.record(field_type, index + 1);
        }
    }
    tally
}

/// Count stream filters across the whole file.
pub fn tally_compression(document: &dyn DocumentBackend) -> CompressionTally {
    let mut tally = CompressionTally::default();
    let filters = match document.stream_filters() {
        Ok(filters) => filters,
        Err(e) => {
            let failure = UnitFailure::document("General error", e.detail());
            warn!(error = %failure, "Compression scan failed");
            tally.errors.push(failure.to_string());
            return tally;
        }
    };

    for filter in &filters {
        let names: Vec<&str> = match filter {
            PdfObject::Name(name) => vec![name.as_str()],
            PdfObject::Array(items) => items.iter().filter_map(PdfObject::as_name).collect(),
            _ => Vec::new(),
        };
        for name in names {
            *tally.filters.entry(name.to_string()).or_insert(0) += 1;
        }
    }
    tally
}
