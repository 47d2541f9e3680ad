//! Document backend adapter.
//!
//! The inspectors never talk to a PDF library directly. They consume the
//! [`DocumentBackend`] capability: page enumeration, resource dictionaries,
//! raw content streams, image placement and region rendering, plus a handful of
//! document-level lookups for the single-pass tallies.
//!
//! Page arguments are 0-based indices. Everything the inspectors report uses
//! 1-based page numbers.

#[cfg(test)]
pub mod fixture;
pub mod object;
pub mod pdfium;

use std::path::Path;

use image::DynamicImage;
use serde::Serialize;

use crate::error::{BackendResult, InspectError, InspectResult};

pub use object::{Dictionary, ObjectId, PdfObject};

/// Rectangle in PDF points, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rectangle {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rectangle {
    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }
}

/// An image placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRegion {
    /// Where the image is drawn, in page space
    pub bounds: Rectangle,
    /// Pixel width of the embedded image
    pub pixel_width: u32,
    /// Pixel height of the embedded image
    pub pixel_height: u32,
}

/// A font as reported by a backend's own font enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeFont {
    pub base_font: String,
    pub subtype: Option<String>,
    pub encoding: Option<String>,
    pub embedded: bool,
}

/// A straight ruling line drawn on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Document-level facts outside the page tree.
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub version: Option<String>,
    pub encrypted: bool,
    /// The trailer's /Info dictionary
    pub info: Dictionary,
}

/// Read access to one open PDF document.
///
/// Implementations must not change observable state between calls: every
/// inspector may re-read the same page several times and expects the same
/// answer.
pub trait DocumentBackend {
    fn page_count(&self) -> usize;

    /// The page's resource dictionary, following /Parent inheritance.
    /// `Ok(None)` when the page has no resources at all.
    fn page_resources(&self, page: usize) -> BackendResult<Option<Dictionary>>;

    /// Decoded content stream bytes; multiple segments are joined in order.
    fn page_content(&self, page: usize) -> BackendResult<Vec<u8>>;

    /// Images drawn on the page, in the order the backend reports them.
    fn page_images(&self, page: usize) -> BackendResult<Vec<ImageRegion>>;

    /// Render `region` of the page at `dpi`.
    fn render_region(&self, page: usize, region: &Rectangle, dpi: f64)
    -> BackendResult<DynamicImage>;

    /// Optional native per-page font enumeration.
    fn native_fonts(&self) -> Option<&dyn NativeFontEnumeration> {
        None
    }

    /// Extracted page text.
    fn page_text(&self, page: usize) -> BackendResult<String>;

    /// Text of the characters that fall inside `region`.
    fn page_text_in(&self, page: usize, region: &Rectangle) -> BackendResult<String>;

    /// Horizontal and vertical ruling lines drawn on the page.
    fn page_line_segments(&self, page: usize) -> BackendResult<Vec<LineSegment>>;

    /// The page's /Annots entries.
    fn page_annotations(&self, page: usize) -> BackendResult<Vec<PdfObject>>;

    /// Identity of the page object, for resolving /P back-references.
    fn page_object_id(&self, page: usize) -> Option<ObjectId>;

    /// Entries of the AcroForm /Fields array.
    fn form_fields(&self) -> BackendResult<Vec<PdfObject>>;

    /// The /Filter value of every object in the file that has one.
    fn stream_filters(&self) -> BackendResult<Vec<PdfObject>>;

    fn document_info(&self) -> BackendResult<DocumentInfo>;
}

/// Backend capability: the library's own view of which fonts each page uses.
pub trait NativeFontEnumeration {
    /// One entry per font reference on the page; a failed entry does not
    /// affect its siblings.
    fn page_fonts(&self, page: usize) -> BackendResult<Vec<BackendResult<NativeFont>>>;
}

/// Check that `path` exists and names a PDF before any backend work.
pub fn validate_source(path: &Path) -> InspectResult<()> {
    if !path.exists() {
        return Err(InspectError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf || !path.is_file() {
        return Err(InspectError::NotAPdf {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        assert!(matches!(
            validate_source(&path),
            Err(InspectError::NotFound { .. })
        ));
    }

    #[test]
    fn test_validate_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        File::create(&path).unwrap();
        assert!(matches!(
            validate_source(&path),
            Err(InspectError::NotAPdf { .. })
        ));
    }

    #[test]
    fn test_validate_directory_is_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folder.pdf");
        std::fs::create_dir(&path).unwrap();
        assert!(matches!(
            validate_source(&path),
            Err(InspectError::NotAPdf { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_uppercase_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("REPORT.PDF");
        File::create(&path).unwrap();
        assert!(validate_source(&path).is_ok());
    }

    #[test]
    fn test_rectangle_dimensions() {
        let rect = Rectangle {
            x1: 10.0,
            y1: 20.0,
            x2: 110.0,
            y2: 70.0,
        };
        assert_eq!(rect.width(), 100.0);
        assert_eq!(rect.height(), 50.0);
    }
}
