//! Text and table export.
//!
//! Each export reads the whole document before anything is written. A page
//! that cannot be read is noted in the output and the export carries on.

pub mod tables;
pub mod text;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{InspectError, InspectResult};

pub use tables::{TableExtraction, TableFormat, extract_tables, render_tables};
pub use text::{TextExport, export_text};

/// Write a rendered export to `path`, replacing any existing file.
pub fn write_export(path: &Path, content: &str) -> InspectResult<()> {
    let file = File::create(path).map_err(InspectError::Io)?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(content.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(InspectError::Io)?;
    debug!(path = %path.display(), bytes = content.len(), "Wrote export");
    Ok(())
}

/// Space-separated words of a cell, with line breaks and runs of whitespace
/// collapsed.
pub fn clean_cell(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Per-column width of the widest cell, never below `minimum`.
pub fn column_widths(rows: &[Vec<String>], minimum: usize) -> Vec<usize> {
    let columns = rows.first().map_or(0, Vec::len);
    (0..columns)
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .max(minimum)
        })
        .collect()
}

/// Rows as left-aligned cells joined by ` | `.
pub fn aligned_rows(rows: &[Vec<String>], widths: &[usize]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            row.iter()
                .zip(widths)
                .map(|(cell, &width)| format!("{:<width$}", cell, width = width))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_clean_cell() {
        assert_eq!(clean_cell("  Unit\r\nprice \t(EUR) "), "Unit price (EUR)");
        assert_eq!(clean_cell("\n"), "");
    }

    #[test]
    fn test_column_widths_with_minimum() {
        let table = rows(&[&["Name", "Qty"], &["Widget", "12"]]);
        assert_eq!(column_widths(&table, 0), vec![6, 3]);
        assert_eq!(column_widths(&table, 5), vec![6, 5]);
        assert!(column_widths(&[], 5).is_empty());
    }

    #[test]
    fn test_aligned_rows() {
        let table = rows(&[&["Name", "Qty"], &["Widget", "12"]]);
        let widths = column_widths(&table, 0);
        assert_eq!(aligned_rows(&table, &widths), vec!["Name   | Qty", "Widget | 12 "]);
    }

    #[test]
    fn test_width_counts_characters_not_bytes() {
        let table = rows(&[&["Größe"], &["ab"]]);
        let widths = column_widths(&table, 0);
        assert_eq!(widths, vec![5]);
        assert_eq!(aligned_rows(&table, &widths)[1], "ab   ");
    }

    #[test]
    fn test_write_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_export(&path, "PAGE 1\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "PAGE 1\n");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_export_reports_a_full_device() {
        let result = write_export(Path::new("/dev/full"), "text");
        assert!(matches!(result, Err(InspectError::Io(_))));
    }
}
