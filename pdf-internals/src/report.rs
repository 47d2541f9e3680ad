//! Human-readable and JSON renderings of inspection results.

use std::path::Path;

use serde::Serialize;

use crate::analysis::{AnalysisReport, DocumentMetadata, PageTally};
use crate::config::ReportConfig;
use crate::error::{InspectError, InspectResult};
use crate::export::{TableExtraction, TextExport};
use crate::images::{EmissionReport, EmittedImage, ImageDeduplicationResult};

const RULE_WIDTH: usize = 70;
const METADATA_WIDTH: usize = 60;

/// Pages above this count are summarized rather than listed in the text section.
const TEXT_PAGE_LIST_LIMIT: usize = 20;

/// `1, 2, 3` with anything past `limit` summarized as the total.
pub fn format_pages(pages: &[usize], limit: usize) -> String {
    let mut listed = pages
        .iter()
        .take(limit)
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if pages.len() > limit {
        listed.push_str(&format!(" ... ({} pages total)", pages.len()));
    }
    listed
}

/// Thousands separators, `1234567` as `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

fn push_section(output: &mut String, title: &str) {
    output.push_str(&format!("\n{}\n{}\n", title, "=".repeat(RULE_WIDTH)));
}

fn push_errors(output: &mut String, errors: &[String], limit: usize) {
    if errors.is_empty() {
        return;
    }
    output.push_str(&format!("  ⚠ Errors encountered: {}\n", errors.len()));
    for error in errors.iter().take(limit) {
        output.push_str(&format!("    - {}\n", error));
    }
    if errors.len() > limit {
        output.push_str(&format!("    ... and {} more\n", errors.len() - limit));
    }
}

/// Entries sorted by key as `• <label>: <key> - Count: n` plus a page line.
fn push_tally(
    output: &mut String,
    tally: &PageTally,
    label: &str,
    noun: &str,
    config: &ReportConfig,
) {
    if tally.is_empty() {
        output.push_str(&format!("  No {} found.\n", noun));
    } else {
        let mut entries: Vec<_> = tally.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (key, pages) in entries {
            output.push_str(&format!("  • {}: {} - Count: {}\n", label, key, pages.len()));
            output.push_str(&format!(
                "    Pages: {}\n",
                format_pages(pages, config.max_listed_pages)
            ));
        }
    }
    output.push_str(&format!("  Total {}: {}\n", noun, tally.total()));
    push_errors(output, &tally.errors, config.max_listed_errors);
}

/// The full analysis report.
pub fn render_analysis(path: &Path, report: &AnalysisReport, config: &ReportConfig) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let metadata = &report.metadata;
    let mut output = format!("\n{}\nPDF INTERNALS ANALYSIS: {}\n{}\n\n", rule, path.display(), rule);

    output.push_str("Document Information:\n");
    output.push_str(&format!("  Total Pages: {}\n", metadata.page_count));
    output.push_str(&format!(
        "  PDF Version: {}\n",
        metadata.version.as_deref().unwrap_or("Unknown")
    ));
    output.push_str(&format!("  Encrypted: {}\n", yes_no(metadata.encrypted)));
    for label in ["Title", "Author"] {
        if let Some(value) = metadata.field(label) {
            output.push_str(&format!("  {}: {}\n", label, value));
        }
    }
    push_errors(&mut output, &report.errors, config.max_listed_errors);
    output.push_str(&format!("\n{}\n", "-".repeat(RULE_WIDTH)));

    push_section(&mut output, "1. FONTS");
    let fonts = &report.fonts;
    output.push_str(&format!("  Detection method: {}\n", fonts.method_label()));
    if fonts.fonts.is_empty() {
        output.push_str("  No fonts found or font information unavailable.\n");
    } else {
        let mut names: Vec<_> = fonts.fonts.iter().collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        for (descriptor, observation) in names {
            output.push_str(&format!("  • {}\n", descriptor));
            output.push_str(&format!(
                "    Pages: {}\n",
                format_pages(&observation.pages, config.max_listed_pages)
            ));
        }
    }
    push_errors(&mut output, &fonts.errors, config.max_listed_errors);
    output.push_str(&format!("  Total unique fonts: {}\n", fonts.fonts.len()));

    push_section(&mut output, "2. IMAGES");
    push_tally(&mut output, &report.images, "Size", "images", config);

    push_section(&mut output, "3. TABLES");
    push_tally(&mut output, &report.tables, "Dimensions", "tables", config);

    push_section(&mut output, "4. TEXT CONTENT");
    let text = &report.text;
    if text.pages_with_text.is_empty() {
        output.push_str("  No text content found.\n");
    } else {
        output.push_str(&format!(
            "  Total characters: {}\n",
            group_thousands(text.total_characters as u64)
        ));
        output.push_str(&format!(
            "  Pages with text: {} of {}\n",
            text.pages_with_text.len(),
            metadata.page_count
        ));
        if text.pages_with_text.len() <= TEXT_PAGE_LIST_LIMIT {
            output.push_str(&format!(
                "  Page numbers: {}\n",
                format_pages(&text.pages_with_text, TEXT_PAGE_LIST_LIMIT)
            ));
        }
    }
    push_errors(&mut output, &text.errors, config.max_listed_errors);

    push_section(&mut output, "5. ANNOTATIONS");
    push_tally(&mut output, &report.annotations, "Type", "annotations", config);

    push_section(&mut output, "6. FORM FIELDS");
    push_tally(&mut output, &report.forms, "Type", "form fields", config);

    push_section(&mut output, "7. COMPRESSION METHODS");
    let compression = &report.compression;
    if compression.filters.is_empty() {
        output.push_str("  No compression information available.\n");
    } else {
        for (name, count) in compression.ranked() {
            output.push_str(&format!("  • {}: {} objects\n", name, count));
        }
    }
    push_errors(&mut output, &compression.errors, config.max_listed_errors);

    let summary = report.summary();
    output.push_str(&format!("\n{}\nSUMMARY\n{}\n", rule, rule));
    output.push_str(&format!("  Pages: {}\n", summary.pages));
    output.push_str(&format!("  Fonts: {}\n", summary.fonts));
    output.push_str(&format!("  Images: {}\n", summary.images));
    output.push_str(&format!("  Tables: {}\n", summary.tables));
    output.push_str(&format!("  Text Pages: {}\n", summary.text_pages));
    output.push_str(&format!("  Annotations: {}\n", summary.annotations));
    output.push_str(&format!("  Form Fields: {}\n", summary.form_fields));
    output.push_str(&format!("  Compression Methods: {}\n", summary.compression_methods));
    if summary.total_errors > 0 {
        output.push_str(&format!("  ⚠ Total Errors: {}\n", summary.total_errors));
        output.push_str("\n  Note: Some elements may not have been fully analyzed due to errors.\n");
    }
    output.push_str(&format!("{}\n", rule));
    output
}

/// Outcome of an extraction run, as emitted with `--json`.
#[derive(Debug, Serialize)]
pub struct ExtractionSummary<'a> {
    pub images: &'a [EmittedImage],
    pub total_found: usize,
    pub unique_saved: usize,
    pub duplicates_skipped: usize,
    pub errors: Vec<String>,
}

impl<'a> ExtractionSummary<'a> {
    pub fn new(result: &ImageDeduplicationResult, emission: &'a EmissionReport) -> Self {
        let errors = result
            .errors
            .iter()
            .cloned()
            .chain(emission.failures.iter().map(|failure| {
                format!("{}: {}", failure, failure.source)
            }))
            .collect();
        Self {
            images: &emission.written,
            total_found: result.total_seen,
            unique_saved: emission.written.len(),
            duplicates_skipped: result.total_duplicate_detections,
            errors,
        }
    }
}

pub fn render_extraction(summary: &ExtractionSummary<'_>) -> String {
    if summary.total_found == 0 && summary.errors.is_empty() {
        return "No images found in PDF.\n".to_string();
    }

    let mut output = String::from("\nSaving unique images...\n");
    for image in summary.images {
        if image.multi {
            let pages = image
                .pages
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            output.push_str(&format!(
                "  Saved: {} (appears on pages: {})\n",
                image.path.display(),
                pages
            ));
        } else {
            output.push_str(&format!("  Saved: {}\n", image.path.display()));
        }
    }
    for error in &summary.errors {
        output.push_str(&format!("  Warning: {}\n", error));
    }

    output.push_str("\nSummary:\n");
    output.push_str(&format!("  Total images found: {}\n", summary.total_found));
    output.push_str(&format!("  Unique images saved: {}\n", summary.unique_saved));
    output.push_str(&format!(
        "  Duplicate images skipped: {}\n",
        summary.duplicates_skipped
    ));
    output
}

pub fn render_metadata(path: &Path, metadata: &DocumentMetadata) -> String {
    let rule = "=".repeat(METADATA_WIDTH);
    let mut output = format!("\n{}\nPDF Metadata for: {}\n{}\n\n", rule, path.display(), rule);

    if let Some(size) = metadata.file_size {
        output.push_str(&format!("File Size: {} bytes\n", group_thousands(size)));
    }
    output.push_str(&format!("Number of Pages: {}\n", metadata.page_count));
    output.push_str(&format!(
        "PDF Version: {}\n",
        metadata.version.as_deref().unwrap_or("Unknown")
    ));
    output.push_str(&format!("Encrypted: {}\n", yes_no(metadata.encrypted)));
    output.push_str(&format!(
        "\n{:-^width$}\n\n",
        "Metadata Information",
        width = METADATA_WIDTH
    ));

    if metadata.is_empty() {
        output.push_str("No metadata found in this PDF file.\n");
        return output;
    }
    for (label, value) in &metadata.fields {
        output.push_str(&format!("{:20}: {}\n", label, value));
    }
    if !metadata.custom.is_empty() {
        output.push_str(&format!(
            "\n{:-^width$}\n\n",
            "Custom Metadata",
            width = METADATA_WIDTH
        ));
        for (key, value) in &metadata.custom {
            output.push_str(&format!("{:20}: {}\n", key, value));
        }
    }
    output
}

/// A text or table export, as emitted with `--json`.
#[derive(Debug, Serialize)]
pub struct ExportSummary<'a, T: Serialize> {
    /// The file written, if any
    pub output: Option<&'a Path>,
    #[serde(flatten)]
    pub result: &'a T,
}

pub fn render_text_export(export: &TextExport, output: &Path) -> String {
    let mut output_text = format!("Processed {} page(s)\n", export.pages);
    for error in &export.errors {
        output_text.push_str(&format!("  Warning: {}\n", error));
    }
    if export.is_blank() {
        output_text.push_str("\nWarning: No text or tables found in PDF.\n");
    }
    output_text.push_str(&format!(
        "\nText extracted successfully!\nOutput saved to: {}\n",
        output.display()
    ));
    output_text
}

pub fn render_table_export(extraction: &TableExtraction, output: Option<&Path>) -> String {
    let mut text = String::new();
    for error in &extraction.errors {
        text.push_str(&format!("  Warning: {}\n", error));
    }
    let Some(output) = output.filter(|_| !extraction.tables.is_empty()) else {
        text.push_str("No tables found in PDF.\n");
        return text;
    };

    let mut per_page: Vec<(usize, usize)> = Vec::new();
    for table in &extraction.tables {
        match per_page.last_mut() {
            Some((page, count)) if *page == table.page => *count += 1,
            _ => per_page.push((table.page, 1)),
        }
    }
    for (page, count) in per_page {
        text.push_str(&format!("Found {} table(s) on page {}\n", count, page));
    }
    text.push_str(&format!(
        "Total tables extracted: {}\n\nOutput saved to: {}\n",
        extraction.tables.len(),
        output.display()
    ));
    text
}

/// Pretty-printed JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> InspectResult<String> {
    serde_json::to_string_pretty(value).map_err(InspectError::Serialization)
}
