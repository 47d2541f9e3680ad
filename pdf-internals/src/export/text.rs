//! Page-by-page plain text, with each page's ruled tables laid out after its
//! text.

use serde::Serialize;
use tracing::{info, warn};

use super::tables::page_tables;
use super::{aligned_rows, column_widths};
use crate::backend::DocumentBackend;
use crate::error::{UnitFailure, truncate_message};

const PAGE_RULE_WIDTH: usize = 70;
/// Narrowest column in tables embedded in the text export.
const MIN_COLUMN_WIDTH: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextExport {
    #[serde(skip)]
    pub content: String,
    pub pages: usize,
    pub pages_with_text: usize,
    pub tables: usize,
    pub errors: Vec<String>,
}

impl TextExport {
    pub fn is_blank(&self) -> bool {
        self.pages_with_text == 0 && self.tables == 0
    }
}

/// Backend line breaks as `\n`.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Render every page under a `PAGE n` banner. A page whose text or tables
/// cannot be read gets a bracketed error line in their place.
pub fn export_text(document: &dyn DocumentBackend) -> TextExport {
    let page_rule = "=".repeat(PAGE_RULE_WIDTH);
    let table_rule = "-".repeat(PAGE_RULE_WIDTH);
    let mut export = TextExport {
        pages: document.page_count(),
        ..TextExport::default()
    };
    let mut lines: Vec<String> = Vec::new();

    for index in 0..document.page_count() {
        let page = index + 1;
        lines.push(page_rule.clone());
        lines.push(format!("PAGE {}", page));
        lines.push(page_rule.clone());
        lines.push(String::new());

        match document.page_text(index) {
            Ok(text) if !text.trim().is_empty() => {
                export.pages_with_text += 1;
                lines.push(normalize_newlines(&text));
                lines.push(String::new());
            }
            Ok(_) => {}
            Err(e) => {
                let failure = UnitFailure::page(page, e.detail());
                warn!(error = %failure, "Text extraction failed");
                export.errors.push(failure.to_string());
                lines.push(format!(
                    "[Error extracting text: {}]",
                    truncate_message(e.detail())
                ));
                lines.push(String::new());
            }
        }

        match page_tables(document, index) {
            Ok(tables) => {
                for (number, table) in tables.iter().enumerate() {
                    export.tables += 1;
                    lines.push(table_rule.clone());
                    lines.push(format!("TABLE {} (Page {})", number + 1, page));
                    lines.push(table_rule.clone());
                    if table.rows.is_empty() {
                        continue;
                    }
                    let widths = column_widths(&table.rows, MIN_COLUMN_WIDTH);
                    lines.extend(aligned_rows(&table.rows, &widths));
                    lines.push(String::new());
                }
            }
            Err(e) => {
                let failure = UnitFailure::page(page, e.detail());
                warn!(error = %failure, "Table extraction failed");
                export.errors.push(failure.to_string());
                lines.push(format!(
                    "[Error extracting tables: {}]",
                    truncate_message(e.detail())
                ));
                lines.push(String::new());
            }
        }
    }

    export.content = lines.join("\n");
    info!(
        pages = export.pages,
        pages_with_text = export.pages_with_text,
        tables = export.tables,
        errors = export.errors.len(),
        "Text export complete"
    );
    export
}
