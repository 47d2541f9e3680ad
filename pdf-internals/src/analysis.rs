//! Whole-document analysis.
//!
//! One pass per concern over the same backend. Each concern keeps its own
//! error list so a failure in one never hides the others.

pub mod metadata;
pub mod tables;
pub mod tallies;

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::DocumentBackend;
use crate::error::UnitFailure;
use crate::fonts::{FontResolutionResult, resolve_fonts};

pub use metadata::{DocumentMetadata, collect_metadata};
pub use tallies::{CompressionTally, PageTally, TextSummary};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub metadata: DocumentMetadata,
    pub fonts: FontResolutionResult,
    pub images: PageTally,
    pub tables: PageTally,
    pub text: TextSummary,
    pub annotations: PageTally,
    pub forms: PageTally,
    pub compression: CompressionTally,
    /// Failures reading document-level information
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub pages: usize,
    pub fonts: usize,
    pub images: usize,
    pub tables: usize,
    pub text_pages: usize,
    pub annotations: usize,
    pub form_fields: usize,
    pub compression_methods: usize,
    pub total_errors: usize,
}

impl AnalysisReport {
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            pages: self.metadata.page_count,
            fonts: self.fonts.fonts.len(),
            images: self.images.total(),
            tables: self.tables.total(),
            text_pages: self.text.pages_with_text.len(),
            annotations: self.annotations.total(),
            form_fields: self.forms.total(),
            compression_methods: self.compression.filters.len(),
            total_errors: self.errors.len()
                + self.fonts.errors.len()
                + self.images.errors.len()
                + self.tables.errors.len()
                + self.text.errors.len()
                + self.annotations.errors.len()
                + self.forms.errors.len()
                + self.compression.errors.len(),
        }
    }
}

/// Run every inspection over `document`.
pub fn analyze(document: &dyn DocumentBackend) -> AnalysisReport {
    let mut errors = Vec::new();
    let metadata = match collect_metadata(document) {
        Ok(metadata) => metadata,
        Err(e) => {
            let failure = UnitFailure::document("Document info", e.detail());
            warn!(error = %failure, "Could not read document info");
            errors.push(failure.to_string());
            DocumentMetadata {
                page_count: document.page_count(),
                ..DocumentMetadata::default()
            }
        }
    };

    let report = AnalysisReport {
        metadata,
        fonts: resolve_fonts(document),
        images: tallies::tally_image_sizes(document),
        tables: tallies::tally_tables(document),
        text: tallies::summarize_text(document),
        annotations: tallies::tally_annotations(document),
        forms: tallies::tally_form_fields(document),
        compression: tallies::tally_compression(document),
        errors,
    };

    let summary = report.summary();
    info!(
        pages = summary.pages,
        fonts = summary.fonts,
        images = summary.images,
        tables = summary.tables,
        errors = summary.total_errors,
        "Analysis complete"
    );
    report
}
