//! Discovery pass: render, normalize, hash and group.

use std::collections::HashMap;

use image::{ColorType, DynamicImage};
use tracing::{debug, info, warn};

use super::hash::{ContentHash, image_content_hash};
use super::{ExtractedImage, ImageDeduplicationResult, OutputFormat};
use crate::backend::DocumentBackend;
use crate::error::UnitFailure;

/// Accumulates unique images keyed by content hash.
#[derive(Debug, Default)]
pub struct ImageCatalog {
    images: Vec<ExtractedImage>,
    by_hash: HashMap<ContentHash, usize>,
    total_seen: usize,
    duplicates: usize,
    errors: Vec<String>,
}

impl ImageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sighting. Returns the first page the content was seen on
    /// when this sighting is a duplicate.
    pub fn record(
        &mut self,
        hash: ContentHash,
        pixels: DynamicImage,
        page: usize,
        image_index: usize,
    ) -> Option<usize> {
        self.total_seen += 1;

        if let Some(&position) = self.by_hash.get(&hash) {
            let existing = &mut self.images[position];
            existing.pages.push(page);
            self.duplicates += 1;
            return Some(existing.first_page);
        }

        self.by_hash.insert(hash, self.images.len());
        self.images.push(ExtractedImage {
            hash,
            width: pixels.width(),
            height: pixels.height(),
            pixels,
            first_page: page,
            image_index,
            pages: vec![page],
        });
        None
    }

    pub fn fail(&mut self, failure: UnitFailure) {
        warn!(error = %failure, "Skipping image");
        self.errors.push(failure.to_string());
    }

    pub fn finish(self) -> ImageDeduplicationResult {
        ImageDeduplicationResult {
            total_unique: self.images.len(),
            images: self.images,
            total_seen: self.total_seen,
            total_duplicate_detections: self.duplicates,
            errors: self.errors,
        }
    }
}

/// Convert a rendered raster to what will be written for `format`.
///
/// JPEG has no alpha channel, so buffers with alpha are flattened to opaque
/// RGB here, before hashing, and duplicate decisions reflect the bytes
/// actually written. Opaque buffers keep their channels and only drop to 8-bit
/// samples.
pub fn prepare_raster(raster: DynamicImage, format: OutputFormat) -> DynamicImage {
    if !format.supports_alpha() {
        let color = raster.color();
        return match color {
            ColorType::L8 | ColorType::Rgb8 => raster,
            _ if color.has_alpha() => DynamicImage::ImageRgb8(raster.to_rgb8()),
            ColorType::L16 => DynamicImage::ImageLuma8(raster.to_luma8()),
            _ => DynamicImage::ImageRgb8(raster.to_rgb8()),
        };
    }
    // PNG cannot store float samples
    if matches!(raster.color(), ColorType::Rgb32F | ColorType::Rgba32F) {
        return DynamicImage::ImageRgba8(raster.to_rgba8());
    }
    raster
}

/// Walk every page in order and catalog every image region.
pub fn discover(document: &dyn DocumentBackend, format: OutputFormat, dpi: f64) -> ImageCatalog {
    let mut catalog = ImageCatalog::new();
    let page_count = document.page_count();
    info!(pages = page_count, dpi, format = %format, "Discovering images");

    for index in 0..page_count {
        let page = index + 1;
        let regions = match document.page_images(index) {
            Ok(regions) => regions,
            Err(e) => {
                catalog.fail(UnitFailure::page(page, e.detail()));
                continue;
            }
        };
        if regions.is_empty() {
            continue;
        }
        debug!(page, images = regions.len(), "Found images on page");

        for (position, region) in regions.iter().enumerate() {
            let image_index = position + 1;

            let raster = match document.render_region(index, &region.bounds, dpi) {
                Ok(raster) => prepare_raster(raster, format),
                Err(e) => {
                    catalog.fail(UnitFailure::image(page, image_index, e.detail()));
                    continue;
                }
            };
            let hash = match image_content_hash(&raster) {
                Ok(hash) => hash,
                Err(e) => {
                    catalog.fail(UnitFailure::image(page, image_index, e));
                    continue;
                }
            };

            if let Some(first_page) = catalog.record(hash, raster, page, image_index) {
                debug!(
                    page,
                    image_index,
                    first_page,
                    "Image is a duplicate"
                );
            }
        }
    }

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fixture::{FixtureDocument, rect, solid_image};
    use crate::images::{deduplicate_images, deduplicate_images_at};

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn assert_counts(result: &ImageDeduplicationResult) {
        assert_eq!(
            result.total_seen,
            result.total_unique + result.total_duplicate_detections
        );
        assert_eq!(result.total_unique, result.images.len());
    }

    #[test]
    fn test_recurring_image_is_grouped() {
        let mut doc = FixtureDocument::new(9);
        for page in [3, 5, 9] {
            doc.page_mut(page)
                .add_image(rect(72.0, 72.0, 172.0, 172.0), solid_image(100, 100, RED));
        }

        let result = deduplicate_images(&doc, OutputFormat::Png);
        assert_counts(&result);
        assert_eq!(result.images.len(), 1);
        assert_eq!(result.images[0].pages, vec![3, 5, 9]);
        assert_eq!(result.images[0].first_page, 3);
        assert_eq!(result.images[0].image_index, 1);
        assert!(result.images[0].is_multi());
        assert_eq!(result.total_duplicate_detections, 2);
    }

    #[test]
    fn test_three_page_document_with_repeat_on_last_page() {
        let mut doc = FixtureDocument::new(3);
        doc.page_mut(1)
            .add_image(rect(0.0, 0.0, 100.0, 100.0), solid_image(100, 100, BLUE));
        // Same pixels at a different spot on the page
        doc.page_mut(3)
            .add_image(rect(200.0, 300.0, 300.0, 400.0), solid_image(100, 100, BLUE));

        let result = deduplicate_images(&doc, OutputFormat::Png);
        assert_counts(&result);
        assert_eq!(result.total_unique, 1);
        assert_eq!(result.images[0].pages, vec![1, 3]);
    }

    #[test]
    fn test_document_without_images() {
        let result = deduplicate_images(&FixtureDocument::new(2), OutputFormat::Jpeg);
        assert_counts(&result);
        assert!(result.images.is_empty());
        assert_eq!(result.total_seen, 0);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_first_seen_order_and_indices() {
        let mut doc = FixtureDocument::new(2);
        doc.page_mut(1)
            .add_image(rect(0.0, 0.0, 10.0, 10.0), solid_image(10, 10, RED));
        doc.page_mut(2)
            .add_image(rect(0.0, 0.0, 10.0, 10.0), solid_image(10, 10, RED));
        doc.page_mut(2)
            .add_image(rect(20.0, 0.0, 30.0, 10.0), solid_image(10, 10, BLUE));

        let result = deduplicate_images(&doc, OutputFormat::Png);
        assert_counts(&result);
        assert_eq!(result.images.len(), 2);
        assert_eq!(result.images[0].pages, vec![1, 2]);
        assert_eq!(
            (result.images[1].first_page, result.images[1].image_index),
            (2, 2)
        );
        assert_eq!(result.images[1].pages, vec![2]);
    }

    #[test]
    fn test_failed_image_is_skipped() {
        let mut doc = FixtureDocument::new(2);
        doc.page_mut(1)
            .add_broken_image(rect(0.0, 0.0, 10.0, 10.0), "unsupported filter JBIG2Decode");
        doc.page_mut(1)
            .add_image(rect(20.0, 0.0, 30.0, 10.0), solid_image(10, 10, RED));
        doc.page_mut(2).images = Err("xref damaged".to_string());

        let result = deduplicate_images(&doc, OutputFormat::Png);
        assert_counts(&result);
        assert_eq!(result.total_seen, 1);
        assert_eq!(result.images[0].image_index, 2);
        assert_eq!(
            result.errors,
            vec![
                "Page 1, image 1: unsupported filter JBIG2Decode",
                "Page 2: xref damaged"
            ]
        );
    }

    #[test]
    fn test_jpeg_flattens_alpha_before_hashing() {
        // Differ only in alpha: distinct as PNG, identical once flattened.
        let mut doc = FixtureDocument::new(2);
        doc.page_mut(1)
            .add_image(rect(0.0, 0.0, 10.0, 10.0), solid_image(10, 10, [9, 9, 9, 255]));
        doc.page_mut(2)
            .add_image(rect(0.0, 0.0, 10.0, 10.0), solid_image(10, 10, [9, 9, 9, 40]));

        let png = deduplicate_images(&doc, OutputFormat::Png);
        assert_eq!(png.total_unique, 2);

        let jpeg = deduplicate_images(&doc, OutputFormat::Jpeg);
        assert_eq!(jpeg.total_unique, 1);
        assert_eq!(jpeg.images[0].pages, vec![1, 2]);
        assert_eq!(jpeg.images[0].pixels.color(), ColorType::Rgb8);
    }

    #[test]
    fn test_same_image_twice_on_one_page() {
        let mut doc = FixtureDocument::new(1);
        doc.page_mut(1)
            .add_image(rect(0.0, 0.0, 10.0, 10.0), solid_image(10, 10, RED));
        doc.page_mut(1)
            .add_image(rect(50.0, 0.0, 60.0, 10.0), solid_image(10, 10, RED));

        let result = deduplicate_images(&doc, OutputFormat::Png);
        assert_counts(&result);
        assert_eq!(result.images[0].pages, vec![1, 1]);
        assert_eq!(result.total_duplicate_detections, 1);
    }

    #[test]
    fn test_deduplication_is_idempotent() {
        let mut doc = FixtureDocument::new(4);
        doc.page_mut(1)
            .add_image(rect(0.0, 0.0, 10.0, 10.0), solid_image(10, 10, RED));
        doc.page_mut(4)
            .add_image(rect(0.0, 0.0, 10.0, 10.0), solid_image(10, 10, RED));
        doc.page_mut(2)
            .add_image(rect(0.0, 0.0, 10.0, 10.0), solid_image(10, 10, BLUE));

        let first = deduplicate_images_at(&doc, OutputFormat::Png, 150.0);
        let second = deduplicate_images_at(&doc, OutputFormat::Png, 150.0);

        let summary = |r: &ImageDeduplicationResult| {
            r.images
                .iter()
                .map(|i| (i.hash, i.first_page, i.image_index, i.pages.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(summary(&first), summary(&second));
        assert_eq!(first.total_seen, second.total_seen);
    }

    #[test]
    fn test_prepare_raster_keeps_png_alpha() {
        let raster = solid_image(4, 4, [1, 2, 3, 4]);
        assert_eq!(
            prepare_raster(raster, OutputFormat::Png).color(),
            ColorType::Rgba8
        );
    }

    #[test]
    fn test_prepare_raster_keeps_opaque_grayscale_for_jpeg() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(2, 2, image::Luma([90])));
        let prepared = prepare_raster(gray.clone(), OutputFormat::Jpeg);
        assert_eq!(prepared.color(), ColorType::L8);
        assert_eq!(prepared, gray);
    }

    #[test]
    fn test_prepare_raster_flattens_only_alpha_for_jpeg() {
        let rgb = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3])));
        assert_eq!(prepare_raster(rgb, OutputFormat::Jpeg).color(), ColorType::Rgb8);

        let gray_alpha =
            DynamicImage::ImageLumaA8(image::GrayAlphaImage::from_pixel(2, 2, image::LumaA([7, 9])));
        assert_eq!(prepare_raster(gray_alpha, OutputFormat::Jpeg).color(), ColorType::Rgb8);

        let rgba = solid_image(2, 2, [1, 2, 3, 4]);
        assert_eq!(prepare_raster(rgba, OutputFormat::Jpeg).color(), ColorType::Rgb8);
    }
}
