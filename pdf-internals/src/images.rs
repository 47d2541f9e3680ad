//! Image deduplication.
//!
//! Two passes over a document: discovery renders every image region and groups
//! identical rasters by content hash, then emission writes each unique image
//! once. Naming needs each image's complete page list, so nothing is written
//! until discovery has seen every page.

pub mod discovery;
pub mod hash;
pub mod naming;
pub mod saving;

use std::fmt;
use std::str::FromStr;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::backend::DocumentBackend;

pub use hash::ContentHash;
pub use saving::{EmissionReport, EmittedImage, write_unique_images};

/// Resolution images are rendered at unless configured otherwise.
pub const DEFAULT_DPI: f64 = 300.0;

/// Highest accepted render resolution. A letter page at this DPI is already
/// about 20400x26400 pixels.
pub const MAX_DPI: f64 = 2400.0;

/// Accept `dpi` only if it is finite and within `(0, MAX_DPI]`.
pub fn check_dpi(dpi: f64) -> Result<f64, String> {
    if dpi.is_finite() && dpi > 0.0 && dpi <= MAX_DPI {
        Ok(dpi)
    } else {
        Err(format!("DPI must be greater than 0 and at most {}, got {}", MAX_DPI, dpi))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// Whether the format can store an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        matches!(self, Self::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(format!("unsupported image format '{}'", other)),
        }
    }
}

/// One unique image and everywhere it was seen.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedImage {
    pub hash: ContentHash,
    /// The raster that will be written, already converted for the output
    /// format.
    #[serde(skip)]
    pub pixels: DynamicImage,
    pub width: u32,
    pub height: u32,
    /// 1-based page of the first sighting
    pub first_page: usize,
    /// 1-based position of the first sighting among its page's images
    pub image_index: usize,
    /// Page of every sighting in discovery order, first sighting included
    pub pages: Vec<usize>,
}

impl ExtractedImage {
    /// Seen more than once.
    pub fn is_multi(&self) -> bool {
        self.pages.len() > 1
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageDeduplicationResult {
    /// Unique images in first-seen order
    pub images: Vec<ExtractedImage>,
    pub total_seen: usize,
    pub total_unique: usize,
    pub total_duplicate_detections: usize,
    pub errors: Vec<String>,
}

/// Discover and group the document's images at [`DEFAULT_DPI`].
pub fn deduplicate_images(
    document: &dyn DocumentBackend,
    format: OutputFormat,
) -> ImageDeduplicationResult {
    deduplicate_images_at(document, format, DEFAULT_DPI)
}

/// Discover and group the document's images rendered at `dpi`.
pub fn deduplicate_images_at(
    document: &dyn DocumentBackend,
    format: OutputFormat,
    dpi: f64,
) -> ImageDeduplicationResult {
    discovery::discover(document, format, dpi).finish()
}
