//! Output file naming.

use std::path::{Path, PathBuf};

use super::OutputFormat;

/// `<base>_page_<NN>_image_<NN>[_multi].<ext>` with 1-based page and image
/// numbers zero-padded to two digits.
pub fn image_file_name(
    base_name: &str,
    page: usize,
    image_index: usize,
    multi: bool,
    format: OutputFormat,
) -> String {
    format!(
        "{}_page_{:02}_image_{:02}{}.{}",
        base_name,
        page,
        image_index,
        if multi { "_multi" } else { "" },
        format.extension()
    )
}

/// The document's file stem, used as the output base name.
pub fn document_base_name(pdf_path: &Path) -> String {
    pdf_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Where images go: `output_dir` if given, else beside the document.
pub fn output_directory(pdf_path: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => pdf_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_page_name() {
        assert_eq!(
            image_file_name("report", 3, 1, false, OutputFormat::Png),
            "report_page_03_image_01.png"
        );
    }

    #[test]
    fn test_multi_page_name() {
        assert_eq!(
            image_file_name("report", 1, 2, true, OutputFormat::Jpeg),
            "report_page_01_image_02_multi.jpeg"
        );
    }

    #[test]
    fn test_numbers_wider_than_padding() {
        assert_eq!(
            image_file_name("big", 120, 15, false, OutputFormat::Png),
            "big_page_120_image_15.png"
        );
    }

    #[test]
    fn test_document_base_name() {
        assert_eq!(document_base_name(Path::new("/tmp/scans/Annual.Report.pdf")), "Annual.Report");
    }

    #[test]
    fn test_output_directory_defaults_to_document_parent() {
        assert_eq!(
            output_directory(Path::new("/data/in/a.pdf"), None),
            PathBuf::from("/data/in")
        );
        assert_eq!(output_directory(Path::new("a.pdf"), None), PathBuf::from("."));
        assert_eq!(
            output_directory(Path::new("/data/in/a.pdf"), Some(Path::new("/out"))),
            PathBuf::from("/out")
        );
    }
}
