//! Emission pass: write each unique image once.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder, ImageError};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::naming::image_file_name;
use super::{ImageDeduplicationResult, OutputFormat};
use crate::error::WriteFailure;

/// JPEG quality used when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// One image written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct EmittedImage {
    pub path: PathBuf,
    pub pages: Vec<usize>,
    pub multi: bool,
}

#[derive(Debug, Default)]
pub struct EmissionReport {
    pub written: Vec<EmittedImage>,
    pub failures: Vec<WriteFailure>,
}

/// Write every unique image in `result` to `output_dir`, in first-seen order.
///
/// A failed write is recorded and the remaining images are still written.
pub fn write_unique_images(
    result: &ImageDeduplicationResult,
    base_name: &str,
    output_dir: &Path,
    format: OutputFormat,
    jpeg_quality: u8,
) -> EmissionReport {
    let mut report = EmissionReport::default();

    for image in &result.images {
        let multi = image.is_multi();
        let path = output_dir.join(image_file_name(
            base_name,
            image.first_page,
            image.image_index,
            multi,
            format,
        ));

        match save_image(&image.pixels, &path, format, jpeg_quality) {
            Ok(()) => {
                debug!(
                    path = %path.display(),
                    pages = ?image.pages,
                    width = image.width,
                    height = image.height,
                    "Saved image"
                );
                report.written.push(EmittedImage {
                    path,
                    pages: image.pages.clone(),
                    multi,
                });
            }
            Err(source) => {
                warn!(path = %path.display(), error = %source, "Failed to write image");
                report.failures.push(WriteFailure { path, source });
            }
        }
    }

    info!(
        written = report.written.len(),
        failed = report.failures.len(),
        "Wrote unique images"
    );
    report
}

/// Encode `image` to `path` in `format`.
pub fn save_image(
    image: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<(), ImageError> {
    let file = File::create(path).map_err(ImageError::IoError)?;
    let mut writer = BufWriter::new(file);

    let (width, height) = (image.width(), image.height());
    let color = image.color().into();

    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut writer).write_image(image.as_bytes(), width, height, color)?
        }
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut writer, jpeg_quality)
            .write_image(image.as_bytes(), width, height, color)?,
    }

    // A write error surfacing only on drop would otherwise be lost
    writer.flush().map_err(ImageError::IoError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fixture::{FixtureDocument, rect, solid_image};
    use crate::images::deduplicate_images;

    fn sample_document() -> FixtureDocument {
        let mut doc = FixtureDocument::new(3);
        doc.page_mut(1)
            .add_image(rect(0.0, 0.0, 100.0, 100.0), solid_image(100, 100, [0, 128, 0, 255]));
        doc.page_mut(2)
            .add_image(rect(0.0, 0.0, 20.0, 20.0), solid_image(20, 20, [200, 0, 0, 255]));
        doc.page_mut(3)
            .add_image(rect(0.0, 0.0, 100.0, 100.0), solid_image(100, 100, [0, 128, 0, 255]));
        doc
    }

    #[test]
    fn test_writes_each_unique_image_once() {
        let dir = tempfile::tempdir().unwrap();
        let result = deduplicate_images(&sample_document(), OutputFormat::Png);

        let report = write_unique_images(&result, "sample", dir.path(), OutputFormat::Png, 75);
        assert!(report.failures.is_empty());

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "sample_page_01_image_01_multi.png",
                "sample_page_02_image_01.png"
            ]
        );
        assert_eq!(report.written[0].pages, vec![1, 3]);
        assert!(report.written[0].multi);

        let reloaded = image::open(&report.written[0].path).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (100, 100));
    }

    #[test]
    fn test_jpeg_output() {
        let dir = tempfile::tempdir().unwrap();
        let result = deduplicate_images(&sample_document(), OutputFormat::Jpeg);

        let report = write_unique_images(&result, "scan", dir.path(), OutputFormat::Jpeg, 90);
        assert!(report.failures.is_empty());
        assert_eq!(report.written.len(), 2);
        assert!(dir.path().join("scan_page_01_image_01_multi.jpeg").is_file());
        assert!(dir.path().join("scan_page_02_image_01.jpeg").is_file());
    }

    #[test]
    fn test_write_failure_does_not_block_later_images() {
        let dir = tempfile::tempdir().unwrap();
        let result = deduplicate_images(&sample_document(), OutputFormat::Png);

        // A directory squatting on the first file name makes that write fail.
        std::fs::create_dir(dir.path().join("sample_page_01_image_01_multi.png")).unwrap();

        let report = write_unique_images(&result, "sample", dir.path(), OutputFormat::Png, 75);
        assert_eq!(report.failures.len(), 1);
        assert!(
            report.failures[0]
                .path
                .ends_with("sample_page_01_image_01_multi.png")
        );
        assert_eq!(report.written.len(), 1);
        assert!(dir.path().join("sample_page_02_image_01.png").is_file());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_save_reports_errors_raised_on_flush() {
        // Small images fit the write buffer, so the device error only shows
        // up when the buffer is flushed.
        let result = save_image(
            &solid_image(4, 4, [10, 20, 30, 255]),
            Path::new("/dev/full"),
            OutputFormat::Png,
            DEFAULT_JPEG_QUALITY,
        );
        assert!(matches!(result, Err(ImageError::IoError(_))));
    }

    #[test]
    fn test_nothing_to_write() {
        let dir = tempfile::tempdir().unwrap();
        let result = deduplicate_images(&FixtureDocument::new(2), OutputFormat::Png);
        let report = write_unique_images(&result, "empty", dir.path(), OutputFormat::Png, 75);
        assert!(report.written.is_empty());
        assert!(report.failures.is_empty());
    }
}
