//! Ruled tables with their cell text, rendered as plain text or HTML.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{aligned_rows, clean_cell, column_widths};
use crate::analysis::tables::detect_tables;
use crate::backend::DocumentBackend;
use crate::error::{BackendResult, UnitFailure};

const TABLE_RULE_WIDTH: usize = 80;

const HTML_STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
h2 { color: #333; }
table { border-collapse: collapse; margin: 20px 0; width: 100%; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #4CAF50; color: white; }
tr:nth-child(even) { background-color: #f2f2f2; }";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Txt,
    Html,
}

impl TableFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Html => "html",
        }
    }

    /// `<base>_tables.<ext>`
    pub fn file_name(&self, base_name: &str) -> String {
        format!("{}_tables.{}", base_name, self.extension())
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One detected table; `rows[0]` is the top row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedTable {
    pub page: usize,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableExtraction {
    /// In page order, then detection order within a page
    pub tables: Vec<ExtractedTable>,
    pub errors: Vec<String>,
}

/// Tables on page `index` with the text inside every cell.
pub fn page_tables(
    document: &dyn DocumentBackend,
    index: usize,
) -> BackendResult<Vec<ExtractedTable>> {
    let segments = document.page_line_segments(index)?;
    let mut tables = Vec::new();
    for grid in detect_tables(&segments) {
        let mut rows = Vec::with_capacity(grid.rows);
        for row in 0..grid.rows {
            let mut cells = Vec::with_capacity(grid.cols);
            for col in 0..grid.cols {
                let text = match grid.cell(row, col) {
                    Some(bounds) => document.page_text_in(index, &bounds)?,
                    None => String::new(),
                };
                cells.push(clean_cell(&text));
            }
            rows.push(cells);
        }
        tables.push(ExtractedTable {
            page: index + 1,
            rows,
        });
    }
    Ok(tables)
}

/// Every table in the document. A page whose tables cannot be read is
/// recorded and skipped.
pub fn extract_tables(document: &dyn DocumentBackend) -> TableExtraction {
    let mut extraction = TableExtraction::default();
    for index in 0..document.page_count() {
        let page = index + 1;
        match page_tables(document, index) {
            Ok(tables) => {
                if !tables.is_empty() {
                    debug!(page, tables = tables.len(), "Found tables on page");
                }
                extraction.tables.extend(tables);
            }
            Err(e) => {
                let failure = UnitFailure::page(page, e.detail());
                warn!(error = %failure, "Table extraction failed");
                extraction.errors.push(failure.to_string());
            }
        }
    }

    info!(
        tables = extraction.tables.len(),
        errors = extraction.errors.len(),
        "Table extraction complete"
    );
    extraction
}

pub fn render_tables(tables: &[ExtractedTable], format: TableFormat) -> String {
    match format {
        TableFormat::Txt => render_txt(tables),
        TableFormat::Html => render_html(tables),
    }
}

fn render_txt(tables: &[ExtractedTable]) -> String {
    let rule = "=".repeat(TABLE_RULE_WIDTH);
    let mut lines = Vec::new();
    for (number, table) in tables.iter().enumerate() {
        lines.push(rule.clone());
        lines.push(format!("Table {} (Page {})", number + 1, table.page));
        lines.push(rule.clone());
        lines.push(String::new());
        if table.rows.is_empty() {
            continue;
        }
        let widths = column_widths(&table.rows, 0);
        lines.extend(aligned_rows(&table.rows, &widths));
        lines.push(String::new());
    }
    lines.join("\n")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// A standalone page; each table's first row becomes its header.
fn render_html(tables: &[ExtractedTable]) -> String {
    let mut lines = vec![
        "<!DOCTYPE html>".to_string(),
        "<html>".to_string(),
        "<head>".to_string(),
        "<meta charset='UTF-8'>".to_string(),
        "<title>Extracted Tables</title>".to_string(),
        "<style>".to_string(),
        HTML_STYLE.to_string(),
        "</style>".to_string(),
        "</head>".to_string(),
        "<body>".to_string(),
        "<h1>Extracted Tables</h1>".to_string(),
    ];

    for (number, table) in tables.iter().enumerate() {
        lines.push(format!("<h2>Table {} (Page {})</h2>", number + 1, table.page));
        lines.push("<table>".to_string());

        if let Some((header, body)) = table.rows.split_first() {
            lines.push("<thead><tr>".to_string());
            for cell in header {
                lines.push(format!("<th>{}</th>", escape_html(cell)));
            }
            lines.push("</tr></thead>".to_string());

            if !body.is_empty() {
                lines.push("<tbody>".to_string());
                for row in body {
                    lines.push("<tr>".to_string());
                    for cell in row {
                        lines.push(format!("<td>{}</td>", escape_html(cell)));
                    }
                    lines.push("</tr>".to_string());
                }
                lines.push("</tbody>".to_string());
            }
        }

        lines.push("</table>".to_string());
    }

    lines.push("</body>".to_string());
    lines.push("</html>".to_string());
    lines.join("\n")
}
