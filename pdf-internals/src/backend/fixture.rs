//! In-memory document used by the unit tests.

use image::{DynamicImage, Rgba, RgbaImage};

use super::{
    Dictionary, DocumentBackend, DocumentInfo, ImageRegion, LineSegment, NativeFont,
    NativeFontEnumeration, ObjectId, PdfObject, Rectangle,
};
use crate::error::{BackendError, BackendResult};

pub struct FixtureImage {
    pub region: ImageRegion,
    pub raster: Result<DynamicImage, String>,
}

pub struct FixturePage {
    pub resources: Result<Option<Dictionary>, String>,
    pub content: Result<Vec<u8>, String>,
    pub images: Result<Vec<FixtureImage>, String>,
    pub text: String,
    /// Text at a point, for region lookups
    pub placed_text: Vec<(f64, f64, String)>,
    /// Makes every text lookup on the page fail
    pub text_error: Option<String>,
    pub segments: Vec<LineSegment>,
    pub annotations: Vec<PdfObject>,
    pub native_fonts: Result<Vec<Result<NativeFont, String>>, String>,
    pub id: ObjectId,
}

impl FixturePage {
    fn blank(index: usize) -> Self {
        Self {
            resources: Ok(None),
            content: Ok(Vec::new()),
            images: Ok(Vec::new()),
            text: String::new(),
            placed_text: Vec::new(),
            text_error: None,
            segments: Vec::new(),
            annotations: Vec::new(),
            native_fonts: Ok(Vec::new()),
            id: (index as u32 * 10 + 3, 0),
        }
    }

    /// Install a /Font resource dictionary.
    pub fn set_fonts(&mut self, fonts: Dictionary) {
        let resources = Dictionary::new().with("Font", PdfObject::Dictionary(fonts));
        self.resources = Ok(Some(resources));
    }

    pub fn place_text(&mut self, x: f64, y: f64, text: &str) {
        self.placed_text.push((x, y, text.to_string()));
    }

    pub fn add_image(&mut self, bounds: Rectangle, raster: DynamicImage) {
        let region = ImageRegion {
            bounds,
            pixel_width: raster.width(),
            pixel_height: raster.height(),
        };
        if let Ok(images) = &mut self.images {
            images.push(FixtureImage {
                region,
                raster: Ok(raster),
            });
        }
    }

    pub fn add_broken_image(&mut self, bounds: Rectangle, message: &str) {
        if let Ok(images) = &mut self.images {
            images.push(FixtureImage {
                region: ImageRegion {
                    bounds,
                    pixel_width: 10,
                    pixel_height: 10,
                },
                raster: Err(message.to_string()),
            });
        }
    }
}

pub struct FixtureDocument {
    pub pages: Vec<FixturePage>,
    pub native: bool,
    pub form_fields: Vec<PdfObject>,
    pub filters: Vec<PdfObject>,
    pub info: DocumentInfo,
}

impl FixtureDocument {
    pub fn new(page_count: usize) -> Self {
        Self {
            pages: (0..page_count).map(FixturePage::blank).collect(),
            native: false,
            form_fields: Vec::new(),
            filters: Vec::new(),
            info: DocumentInfo::default(),
        }
    }

    /// Advertise the native font enumeration capability.
    pub fn with_native_fonts(mut self) -> Self {
        self.native = true;
        self
    }

    /// Page by 1-based number.
    pub fn page_mut(&mut self, number: usize) -> &mut FixturePage {
        &mut self.pages[number - 1]
    }

    fn page(&self, page: usize) -> BackendResult<&FixturePage> {
        self.pages.get(page).ok_or(BackendError::PageOutOfRange {
            page: page + 1,
            count: self.pages.len(),
        })
    }

    fn text_page(&self, page: usize) -> BackendResult<&FixturePage> {
        let fixture = self.page(page)?;
        match &fixture.text_error {
            Some(message) => Err(BackendError::Page {
                page: page + 1,
                message: message.clone(),
            }),
            None => Ok(fixture),
        }
    }
}

impl DocumentBackend for FixtureDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_resources(&self, page: usize) -> BackendResult<Option<Dictionary>> {
        self.page(page)?
            .resources
            .clone()
            .map_err(|message| BackendError::Page {
                page: page + 1,
                message,
            })
    }

    fn page_content(&self, page: usize) -> BackendResult<Vec<u8>> {
        self.page(page)?
            .content
            .clone()
            .map_err(|message| BackendError::Page {
                page: page + 1,
                message,
            })
    }

    fn page_images(&self, page: usize) -> BackendResult<Vec<ImageRegion>> {
        match &self.page(page)?.images {
            Ok(images) => Ok(images.iter().map(|image| image.region.clone()).collect()),
            Err(message) => Err(BackendError::Page {
                page: page + 1,
                message: message.clone(),
            }),
        }
    }

    fn render_region(
        &self,
        page: usize,
        region: &Rectangle,
        _dpi: f64,
    ) -> BackendResult<DynamicImage> {
        let images = self.page(page)?.images.as_ref().map_err(|message| {
            BackendError::Render {
                page: page + 1,
                message: message.clone(),
            }
        })?;
        let image = images
            .iter()
            .find(|image| image.region.bounds == *region)
            .ok_or_else(|| BackendError::Render {
                page: page + 1,
                message: "no image at region".to_string(),
            })?;
        image.raster.clone().map_err(|message| BackendError::Render {
                page: page + 1,
                message,
            })
    }

    fn native_fonts(&self) -> Option<&dyn NativeFontEnumeration> {
        if self.native { Some(self) } else { None }
    }

    fn page_text(&self, page: usize) -> BackendResult<String> {
        Ok(self.text_page(page)?.text.clone())
    }

    fn page_text_in(&self, page: usize, region: &Rectangle) -> BackendResult<String> {
        let (x_lo, x_hi) = (region.x1.min(region.x2), region.x1.max(region.x2));
        let (y_lo, y_hi) = (region.y1.min(region.y2), region.y1.max(region.y2));
        Ok(self
            .text_page(page)?
            .placed_text
            .iter()
            .filter(|(x, y, _)| (x_lo..=x_hi).contains(x) && (y_lo..=y_hi).contains(y))
            .map(|(_, _, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn page_line_segments(&self, page: usize) -> BackendResult<Vec<LineSegment>> {
        Ok(self.page(page)?.segments.clone())
    }

    fn page_annotations(&self, page: usize) -> BackendResult<Vec<PdfObject>> {
        Ok(self.page(page)?.annotations.clone())
    }

    fn page_object_id(&self, page: usize) -> Option<ObjectId> {
        self.pages.get(page).map(|p| p.id)
    }

    fn form_fields(&self) -> BackendResult<Vec<PdfObject>> {
        Ok(self.form_fields.clone())
    }

    fn stream_filters(&self) -> BackendResult<Vec<PdfObject>> {
        Ok(self.filters.clone())
    }

    fn document_info(&self) -> BackendResult<DocumentInfo> {
        Ok(self.info.clone())
    }
}

impl NativeFontEnumeration for FixtureDocument {
    fn page_fonts(&self, page: usize) -> BackendResult<Vec<BackendResult<NativeFont>>> {
        match &self.page(page)?.native_fonts {
            Ok(fonts) => Ok(fonts
                .iter()
                .map(|font| {
                    font.clone()
                        .map_err(|message| BackendError::Object { message })
                })
                .collect()),
            Err(message) => Err(BackendError::Page {
                page: page + 1,
                message: message.clone(),
            }),
        }
    }
}

/// A simple font dictionary.
pub fn font_object(base_font: &str, subtype: &str) -> PdfObject {
    PdfObject::Dictionary(
        Dictionary::new()
            .with("Type", PdfObject::name("Font"))
            .with("BaseFont", PdfObject::name(base_font))
            .with("Subtype", PdfObject::name(subtype)),
    )
}

pub fn native_font(base_font: &str, subtype: &str, embedded: bool) -> NativeFont {
    NativeFont {
        base_font: base_font.to_string(),
        subtype: Some(subtype.to_string()),
        encoding: None,
        embedded,
    }
}

/// Solid-colour raster.
pub fn solid_image(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
}

pub fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> Rectangle {
    Rectangle { x1, y1, x2, y2 }
}
