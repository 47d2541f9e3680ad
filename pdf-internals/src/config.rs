//! Runtime configuration.
//!
//! Every field has a default, so a missing config file and an empty
//! environment still yield a complete [`AppConfig`].

mod loader;

use serde::Deserialize;
use std::path::PathBuf;

use crate::images::DEFAULT_DPI;
use crate::images::saving::DEFAULT_JPEG_QUALITY;

pub use loader::{load_config, load_config_file};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pdfium: PdfiumConfig,

    #[serde(default)]
    pub fonts: FontsConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// PDFium library discovery
#[derive(Debug, Clone, Deserialize)]
pub struct PdfiumConfig {
    /// Directories searched for the PDFium shared library before the system
    /// library paths
    #[serde(default = "default_library_dirs")]
    pub library_dirs: Vec<String>,
}

impl Default for PdfiumConfig {
    fn default() -> Self {
        Self {
            library_dirs: default_library_dirs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FontsConfig {
    /// Offer the backend's own font enumeration as the first strategy
    #[serde(default = "default_true")]
    pub native_enumeration: bool,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            native_enumeration: true,
        }
    }
}

/// Image extraction
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_dpi")]
    pub dpi: f64,

    /// Where extracted images are written. Defaults to the PDF's directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            output_dir: None,
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Text report truncation
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_max_listed_pages")]
    pub max_listed_pages: usize,

    #[serde(default = "default_max_listed_errors")]
    pub max_listed_errors: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_listed_pages: default_max_listed_pages(),
            max_listed_errors: default_max_listed_errors(),
        }
    }
}

fn default_library_dirs() -> Vec<String> {
    vec!["./".to_string(), "./vendor/pdfium/lib/".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_dpi() -> f64 {
    DEFAULT_DPI
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_max_listed_pages() -> usize {
    10
}

fn default_max_listed_errors() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.pdfium.library_dirs, vec!["./", "./vendor/pdfium/lib/"]);
        assert!(config.fonts.native_enumeration);
        assert_eq!(config.images.dpi, 300.0);
        assert_eq!(config.images.output_dir, None);
        assert_eq!(config.images.jpeg_quality, 75);
        assert_eq!(config.report.max_listed_pages, 10);
        assert_eq!(config.report.max_listed_errors, 3);
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"images": {"dpi": 150}, "report": {"max_listed_errors": 5}}"#)
                .unwrap();
        assert_eq!(config.images.dpi, 150.0);
        assert_eq!(config.images.jpeg_quality, 75);
        assert_eq!(config.report.max_listed_errors, 5);
        assert_eq!(config.report.max_listed_pages, 10);
        assert!(config.fonts.native_enumeration);
    }
}
