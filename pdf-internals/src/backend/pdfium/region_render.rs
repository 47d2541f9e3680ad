//! Page region rendering using pdfium-render.
//!
//! A region is rendered by rasterizing the whole page at the target DPI and
//! cropping, so image edges land on the same pixels whichever region of the
//! page is requested.

use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;
use tracing::debug;

use crate::backend::Rectangle;
use crate::error::{BackendError, BackendResult};

/// Pixel window of a region on a page rendered at some DPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Full-page pixel dimensions at `dpi`.
pub fn page_pixel_size(page_width_pts: f64, page_height_pts: f64, dpi: f64) -> (u32, u32) {
    let pixels_per_point = dpi / 72.0;
    (
        (page_width_pts * pixels_per_point).ceil().max(1.0) as u32,
        (page_height_pts * pixels_per_point).ceil().max(1.0) as u32,
    )
}

/// Map a region in PDF points onto the page raster.
///
/// The region is intersected with the page box first, so parts hanging off any
/// edge are dropped rather than replaced by neighbouring page content. PDF
/// coordinates have origin at bottom-left, image coordinates at top-left.
pub fn region_window(
    region: &Rectangle,
    page_width_pts: f64,
    page_height_pts: f64,
    dpi: f64,
) -> PixelWindow {
    let pixels_per_point = dpi / 72.0;
    let (full_width, full_height) = page_pixel_size(page_width_pts, page_height_pts, dpi);

    let x_lo = region.x1.min(region.x2).clamp(0.0, page_width_pts);
    let x_hi = region.x1.max(region.x2).clamp(0.0, page_width_pts);
    let y_lo = region.y1.min(region.y2).clamp(0.0, page_height_pts);
    let y_hi = region.y1.max(region.y2).clamp(0.0, page_height_pts);

    let left = ((x_lo * pixels_per_point).floor() as u32).min(full_width - 1);
    let right = ((x_hi * pixels_per_point).ceil() as u32).min(full_width);
    let top = (((page_height_pts - y_hi) * pixels_per_point).floor() as u32).min(full_height - 1);
    let bottom = (((page_height_pts - y_lo) * pixels_per_point).ceil() as u32).min(full_height);

    PixelWindow {
        left,
        top,
        width: right.saturating_sub(left).max(1),
        height: bottom.saturating_sub(top).max(1),
    }
}

/// Render a full page at `dpi`.
pub fn render_full_page(page: &PdfPage, page_number: usize, dpi: f64) -> BackendResult<RgbaImage> {
    let (width, height) = page_pixel_size(page.width().value as f64, page.height().value as f64, dpi);

    let config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_target_height(height as i32);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| BackendError::Render {
            page: page_number,
            message: e.to_string(),
        })?;

    // Use pdfium-render's built-in conversion which handles color format correctly
    let full_image: DynamicImage = bitmap.as_image();
    Ok(full_image.to_rgba8())
}

/// Crop a region out of an already rendered page.
pub fn crop_region(
    rendered: &RgbaImage,
    region: &Rectangle,
    page_width_pts: f64,
    page_height_pts: f64,
    dpi: f64,
) -> RgbaImage {
    let window = region_window(region, page_width_pts, page_height_pts, dpi);

    debug!(
        region_pts = format!(
            "({:.1},{:.1})-({:.1},{:.1})",
            region.x1, region.y1, region.x2, region.y2
        ),
        region_px = format!(
            "({},{})-({},{})",
            window.left,
            window.top,
            window.left + window.width,
            window.top + window.height
        ),
        dpi = dpi,
        "Cropping page region"
    );

    image::imageops::crop_imm(rendered, window.left, window.top, window.width, window.height)
        .to_image()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_page_at_300_dpi() {
        let (width, height) = page_pixel_size(612.0, 792.0, 300.0);
        // Allow for floating-point rounding (ceil can round up by 1)
        assert!((width as i64 - 2550).abs() <= 1, "width was {}", width);
        assert!((height as i64 - 3300).abs() <= 1, "height was {}", height);
    }

    #[test]
    fn test_region_window_flips_y_axis() {
        // A 72pt square one inch from the top-left corner of a letter page.
        let region = Rectangle {
            x1: 72.0,
            y1: 648.0,
            x2: 144.0,
            y2: 720.0,
        };
        let window = region_window(&region, 612.0, 792.0, 72.0);
        assert_eq!(
            window,
            PixelWindow {
                left: 72,
                top: 72,
                width: 72,
                height: 72
            }
        );
    }

    #[test]
    fn test_region_window_is_clamped_to_page() {
        let region = Rectangle {
            x1: 500.0,
            y1: -50.0,
            x2: 700.0,
            y2: 100.0,
        };
        let window = region_window(&region, 612.0, 792.0, 72.0);
        assert_eq!(window.left, 500);
        assert_eq!(window.top, 692);
        assert_eq!(window.left + window.width, 612);
        assert_eq!(window.top + window.height, 792);
    }

    #[test]
    fn test_region_overhanging_left_and_top_keeps_only_the_visible_part() {
        let left_overhang = Rectangle {
            x1: -50.0,
            y1: 0.0,
            x2: 50.0,
            y2: 100.0,
        };
        assert_eq!(
            region_window(&left_overhang, 612.0, 792.0, 72.0),
            PixelWindow {
                left: 0,
                top: 692,
                width: 50,
                height: 100
            }
        );

        let top_overhang = Rectangle {
            x1: 100.0,
            y1: 742.0,
            x2: 200.0,
            y2: 842.0,
        };
        assert_eq!(
            region_window(&top_overhang, 612.0, 792.0, 72.0),
            PixelWindow {
                left: 100,
                top: 0,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn test_crop_of_overhanging_region_excludes_neighbouring_pixels() {
        let mut rendered = RgbaImage::from_pixel(612, 792, image::Rgba([255, 255, 255, 255]));
        for y in 692..792 {
            for x in 50..60 {
                rendered.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
            }
        }
        let region = Rectangle {
            x1: -50.0,
            y1: 0.0,
            x2: 50.0,
            y2: 100.0,
        };
        let cropped = crop_region(&rendered, &region, 612.0, 792.0, 72.0);
        assert_eq!(cropped.dimensions(), (50, 100));
        assert!(cropped.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_crop_region_size() {
        let rendered = RgbaImage::new(612, 792);
        let region = Rectangle {
            x1: 0.0,
            y1: 0.0,
            x2: 100.0,
            y2: 100.0,
        };
        let cropped = crop_region(&rendered, &region, 612.0, 792.0, 72.0);
        assert_eq!(cropped.dimensions(), (100, 100));
    }
}
