//! Production backend: pdfium for text, images and rendering, qpdf for the
//! object graph (resources, content streams, annotations, forms, filters).

pub mod region_render;

use std::cell::RefCell;
use std::path::Path;

use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;
use qpdf::{
    QPdf, QPdfArray, QPdfDictionary, QPdfObject, QPdfObjectLike, QPdfObjectType, QPdfScalar, QPdfStream,
    StreamDecodeLevel,
};
use tracing::{debug, info, trace, warn};

use super::{
    Dictionary, DocumentBackend, DocumentInfo, ImageRegion, LineSegment, NativeFont,
    NativeFontEnumeration, ObjectId, PdfObject, Rectangle, validate_source,
};
use crate::config::PdfiumConfig;
use crate::error::{BackendError, BackendResult, InspectResult};

/// Nesting budget when copying a page's resource tree (Resources > Font >
/// font dictionary > Encoding > Differences).
const RESOURCE_DEPTH: usize = 4;
/// Nesting budget for annotations, form fields and the /Info dictionary.
const SHALLOW_DEPTH: usize = 1;
/// Longest /Parent chain followed when inheriting page resources.
const MAX_PARENT_CHAIN: usize = 32;
/// Path objects thinner than this many points count as ruling lines.
const RULE_THICKNESS: f64 = 2.0;

/// Bind to the PDFium library.
///
/// Searches each configured directory in order, then the system library
/// paths.
pub fn create_pdfium(config: &PdfiumConfig) -> BackendResult<Pdfium> {
    let mut last_error = None;
    for dir in &config.library_dirs {
        match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)) {
            Ok(bindings) => {
                debug!(dir = %dir, "Bound to PDFium library");
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => {
                trace!(dir = %dir, error = ?e, "PDFium library not found");
                last_error = Some(e);
            }
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| BackendError::Library {
            message: format!(
                "install libpdfium or add its directory to pdfium.library_dirs: {:?}",
                last_error.unwrap_or(e)
            ),
        })
}

struct CachedRender {
    page: usize,
    dpi_bits: u64,
    width_pts: f64,
    height_pts: f64,
    image: RgbaImage,
}

/// A PDF opened with both pdfium and qpdf.
pub struct PdfiumBackend<'a> {
    document: PdfDocument<'a>,
    structure: QPdf,
    pages: Vec<QPdfDictionary>,
    native_fonts: bool,
    render_cache: RefCell<Option<CachedRender>>,
}

impl<'a> PdfiumBackend<'a> {
    /// Validate `path` and open it.
    ///
    /// `native_fonts` controls whether the pdfium font enumeration is
    /// advertised to the font resolver.
    pub fn open(pdfium: &'a Pdfium, path: &Path, native_fonts: bool) -> InspectResult<Self> {
        validate_source(path)?;

        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| BackendError::Load {
                source: Box::new(std::io::Error::other(format!(
                    "Failed to load PDF: {:?}",
                    e
                ))),
            })?;

        let structure = QPdf::read(path).map_err(|e| BackendError::Load {
            source: Box::new(std::io::Error::other(format!(
                "Failed to load PDF with qpdf: {}",
                e
            ))),
        })?;

        let pages = structure.get_pages().map_err(|e| BackendError::Load {
            source: Box::new(std::io::Error::other(format!(
                "Failed to get pages from PDF: {}",
                e
            ))),
        })?;

        info!(
            path = %path.display(),
            pages = pages.len(),
            version = %structure.get_pdf_version(),
            "Opened PDF"
        );

        Ok(Self {
            document,
            structure,
            pages,
            native_fonts,
            render_cache: RefCell::new(None),
        })
    }

    fn page_dict(&self, page: usize) -> BackendResult<&QPdfDictionary> {
        self.pages.get(page).ok_or(BackendError::PageOutOfRange {
            page: page + 1,
            count: self.pages.len(),
        })
    }

    fn pdfium_page(&self, page: usize) -> BackendResult<PdfPage<'_>> {
        let index = u16::try_from(page).map_err(|_| BackendError::PageOutOfRange {
            page: page + 1,
            count: self.pages.len(),
        })?;
        self.document
            .pages()
            .get(index)
            .map_err(|e| BackendError::Page {
                page: page + 1,
                message: e.to_string(),
            })
    }

    fn page_fonts_from_pdfium(&self, page: usize) -> BackendResult<Vec<BackendResult<NativeFont>>> {
        let pdf_page = self.pdfium_page(page)?;
        let resources = self.page_resources(page).ok().flatten();
        let font_resources = resources.as_ref().and_then(|r| r.get_dict("Font"));

        let mut seen: Vec<String> = Vec::new();
        let mut fonts = Vec::new();

        for object in pdf_page.objects().iter() {
            let PdfPageObject::Text(text_obj) = &object else {
                continue;
            };
            let font = text_obj.font();
            let name = font.name();
            if seen.contains(&name) {
                continue;
            }
            seen.push(name.clone());

            let entry = font
                .is_embedded()
                .map_err(|e| BackendError::Object {
                    message: format!("font '{}': {}", name, e),
                })
                .map(|embedded| {
                    let declared = font_resources.and_then(|fonts| match_font_resource(fonts, &name));
                    NativeFont {
                        subtype: declared
                            .and_then(|dict| dict.get_name("Subtype"))
                            .map(str::to_string),
                        encoding: declared.and_then(|dict| match dict.get("Encoding") {
                            Some(PdfObject::Name(name)) => Some(name.clone()),
                            Some(PdfObject::Dictionary(enc)) => {
                                enc.get_name("BaseEncoding").map(str::to_string)
                            }
                            _ => None,
                        }),
                        base_font: name.clone(),
                        embedded,
                    }
                });
            fonts.push(entry);
        }

        trace!(page = page + 1, fonts = fonts.len(), "Enumerated fonts with pdfium");
        Ok(fonts)
    }
}

/// Find the /Font resource whose /BaseFont names exactly the same face as
/// `name`, ignoring subset tags on either side.
fn match_font_resource<'d>(fonts: &'d Dictionary, name: &str) -> Option<&'d Dictionary> {
    let name = strip_subset_tag(name);
    if name.is_empty() {
        return None;
    }
    fonts.iter().find_map(|(_, font)| {
        let dict = font.as_dict()?;
        let base = strip_subset_tag(dict.get_name("BaseFont")?);
        (base == name).then_some(dict)
    })
}

/// Remove a six-letter subset prefix such as `ABCDEF+`.
fn strip_subset_tag(base_font: &str) -> &str {
    match base_font.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => base_font,
    }
}

/// Walk up the page tree from `node` until a /Resources entry is found.
fn inherited_resources(node: &QPdfDictionary, page: usize) -> BackendResult<Option<QPdfObject>> {
    let mut node = QPdfDictionary::from(node.as_object().clone());
    for _ in 0..MAX_PARENT_CHAIN {
        if let Some(resources) = node.get("/Resources") {
            return Ok(Some(resources));
        }
        match node.get("/Parent") {
            Some(parent) if parent.get_type() == QPdfObjectType::Dictionary => {
                node = parent.into();
            }
            _ => return Ok(None),
        }
    }
    Err(BackendError::Page {
        page: page + 1,
        message: "page tree /Parent chain too deep".to_string(),
    })
}

fn resources_of(page_dict: &QPdfDictionary, page: usize) -> BackendResult<Option<Dictionary>> {
    let Some(resources) = inherited_resources(page_dict, page)? else {
        return Ok(None);
    };
    match convert_object(&resources, RESOURCE_DEPTH) {
        PdfObject::Dictionary(dict) => Ok(Some(dict)),
        other => Err(BackendError::Page {
            page: page + 1,
            message: format!("/Resources is a {}", other.type_name()),
        }),
    }
}

/// Decoded /Contents of a page. Array segments are joined with a newline; one
/// unreadable segment fails the whole page.
fn content_of(page_dict: &QPdfDictionary, page: usize) -> BackendResult<Vec<u8>> {
    let Some(contents) = page_dict.get("/Contents") else {
        return Ok(Vec::new());
    };

    match contents.get_type() {
        QPdfObjectType::Array => {
            let segments: QPdfArray = contents.into();
            let mut data = Vec::new();
            for (i, segment) in segments.iter().enumerate() {
                if i > 0 {
                    data.push(b'\n');
                }
                data.extend(read_stream(segment, page)?);
            }
            Ok(data)
        }
        _ => read_stream(contents, page),
    }
}

/// The /Filter entry of every stream object numbered below the trailer /Size.
fn filters_of(structure: &QPdf) -> BackendResult<Vec<PdfObject>> {
    let size = structure
        .get_trailer()
        .and_then(|trailer| trailer.get("/Size"))
        .map(|size| QPdfScalar::from(size).as_i64())
        .ok_or_else(|| BackendError::Object {
            message: "trailer has no /Size".to_string(),
        })?;

    let mut filters = Vec::new();
    for id in 1..size.max(1) {
        let Ok(id) = u32::try_from(id) else {
            break;
        };
        let Some(object) = structure.get_object_by_id(id, 0) else {
            continue;
        };
        if object.get_type() != QPdfObjectType::Stream {
            continue;
        }
        let stream: QPdfStream = object.into();
        if let Some(filter) = stream.get_dictionary().get("/Filter") {
            filters.push(convert_object(&filter, SHALLOW_DEPTH));
        }
    }

    debug!(streams_with_filters = filters.len(), "Collected stream filters");
    Ok(filters)
}

/// Copy a qpdf object into the backend-agnostic model.
///
/// Every container entered spends one unit of `depth`; an indirect container
/// reached with no budget left is returned as a reference.
fn convert_object(object: &QPdfObject, depth: usize) -> PdfObject {
    let object_type = object.get_type();
    let is_container = matches!(
        object_type,
        QPdfObjectType::Array | QPdfObjectType::Dictionary | QPdfObjectType::Stream
    );
    if is_container && depth == 0 {
        return if object.is_indirect() {
            PdfObject::Reference((object.get_id(), object.get_generation()))
        } else {
            PdfObject::Unreadable("nesting limit reached".to_string())
        };
    }

    match object_type {
        QPdfObjectType::Null => PdfObject::Null,
        QPdfObjectType::Boolean => PdfObject::Boolean(object.as_bool()),
        QPdfObjectType::Integer => PdfObject::Integer(QPdfScalar::from(object.clone()).as_i64()),
        QPdfObjectType::Real => match QPdfScalar::from(object.clone()).as_real().parse() {
            Ok(value) => PdfObject::Real(value),
            Err(_) => PdfObject::Unreadable(format!("bad real '{}'", QPdfScalar::from(object.clone()).as_real())),
        },
        QPdfObjectType::Name => PdfObject::name(&object.as_name()),
        QPdfObjectType::String => PdfObject::String(object.as_binary_string()),
        QPdfObjectType::Array => {
            let array: QPdfArray = object.clone().into();
            PdfObject::Array(
                array
                    .iter()
                    .map(|item| convert_object(&item, depth - 1))
                    .collect(),
            )
        }
        QPdfObjectType::Dictionary => {
            let dict: QPdfDictionary = object.clone().into();
            PdfObject::Dictionary(convert_dictionary(&dict, object_id(object), depth - 1))
        }
        QPdfObjectType::Stream => {
            let stream: QPdfStream = object.clone().into();
            PdfObject::Stream(convert_dictionary(
                &stream.get_dictionary(),
                object_id(object),
                depth - 1,
            ))
        }
        other => PdfObject::Unreadable(format!("unsupported object type {:?}", other)),
    }
}

fn convert_dictionary(dict: &QPdfDictionary, id: Option<ObjectId>, depth: usize) -> Dictionary {
    let mut converted = match id {
        Some(id) => Dictionary::with_id(id),
        None => Dictionary::new(),
    };
    for key in dict.keys() {
        let value = match dict.get(&key) {
            Some(value) => convert_object(&value, depth),
            None => PdfObject::Unreadable(format!("missing value for {}", key)),
        };
        converted.insert(&key, value);
    }
    converted
}

fn object_id(object: &impl QPdfObjectLike) -> Option<ObjectId> {
    object
        .is_indirect()
        .then(|| (object.get_id(), object.get_generation()))
}

fn read_stream(object: QPdfObject, page: usize) -> BackendResult<Vec<u8>> {
    if object.get_type() != QPdfObjectType::Stream {
        return Err(BackendError::Page {
            page: page + 1,
            message: format!("content is a {:?}, not a stream", object.get_type()),
        });
    }
    let stream: QPdfStream = object.into();
    stream
        .get_data(StreamDecodeLevel::Generalized)
        .map(|data| data.to_vec())
        .map_err(|e| BackendError::Page {
            page: page + 1,
            message: e.to_string(),
        })
}

fn pdf_rect_to_rectangle(rect: &PdfRect) -> Rectangle {
    Rectangle {
        x1: rect.left().value as f64,
        y1: rect.bottom().value as f64,
        x2: rect.right().value as f64,
        y2: rect.top().value as f64,
    }
}

impl DocumentBackend for PdfiumBackend<'_> {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_resources(&self, page: usize) -> BackendResult<Option<Dictionary>> {
        resources_of(self.page_dict(page)?, page)
    }

    fn page_content(&self, page: usize) -> BackendResult<Vec<u8>> {
        content_of(self.page_dict(page)?, page)
    }

    fn page_images(&self, page: usize) -> BackendResult<Vec<ImageRegion>> {
        let pdf_page = self.pdfium_page(page)?;
        let mut images = Vec::new();

        for object in pdf_page.objects().iter() {
            if let PdfPageObject::Image(image_obj) = &object
                && let Ok(quad_points) = image_obj.bounds()
            {
                let bounds = quad_points.to_rect();
                let (pixel_width, pixel_height) = match image_obj.get_raw_image() {
                    Ok(img) => (img.width(), img.height()),
                    // Estimate from bounds at 72 DPI
                    Err(_) => (
                        (bounds.width().value as u32).max(1),
                        (bounds.height().value as u32).max(1),
                    ),
                };
                images.push(ImageRegion {
                    bounds: pdf_rect_to_rectangle(&bounds),
                    pixel_width,
                    pixel_height,
                });
            }
        }

        debug!(page = page + 1, images = images.len(), "Found images on page");
        Ok(images)
    }

    fn render_region(
        &self,
        page: usize,
        region: &Rectangle,
        dpi: f64,
    ) -> BackendResult<DynamicImage> {
        let dpi_bits = dpi.to_bits();
        let mut cache = self.render_cache.borrow_mut();

        let fresh = !matches!(&*cache, Some(c) if c.page == page && c.dpi_bits == dpi_bits);
        if fresh {
            let pdf_page = self.pdfium_page(page)?;
            let image = region_render::render_full_page(&pdf_page, page + 1, dpi)?;
            *cache = Some(CachedRender {
                page,
                dpi_bits,
                width_pts: pdf_page.width().value as f64,
                height_pts: pdf_page.height().value as f64,
                image,
            });
        }

        let rendered = cache.as_ref().ok_or_else(|| BackendError::Render {
            page: page + 1,
            message: "page render unavailable".to_string(),
        })?;
        let cropped = region_render::crop_region(
            &rendered.image,
            region,
            rendered.width_pts,
            rendered.height_pts,
            dpi,
        );
        Ok(DynamicImage::ImageRgba8(cropped))
    }

    fn native_fonts(&self) -> Option<&dyn NativeFontEnumeration> {
        if self.native_fonts { Some(self) } else { None }
    }

    fn page_text(&self, page: usize) -> BackendResult<String> {
        let pdf_page = self.pdfium_page(page)?;
        let text = pdf_page.text().map_err(|e| BackendError::Page {
            page: page + 1,
            message: format!("Failed to extract text: {:?}", e),
        })?;
        Ok(text.all())
    }

    fn page_text_in(&self, page: usize, region: &Rectangle) -> BackendResult<String> {
        let pdf_page = self.pdfium_page(page)?;
        let text = pdf_page.text().map_err(|e| BackendError::Page {
            page: page + 1,
            message: format!("Failed to extract text: {:?}", e),
        })?;
        Ok(text.inside_rect(PdfRect::new_from_values(
            region.y1.min(region.y2) as f32,
            region.x1.min(region.x2) as f32,
            region.y1.max(region.y2) as f32,
            region.x1.max(region.x2) as f32,
        )))
    }

    fn page_line_segments(&self, page: usize) -> BackendResult<Vec<LineSegment>> {
        let pdf_page = self.pdfium_page(page)?;
        let mut segments = Vec::new();

        for object in pdf_page.objects().iter() {
            if let PdfPageObject::Path(_) = &object
                && let Ok(quad_points) = object.bounds()
            {
                let bounds = pdf_rect_to_rectangle(&quad_points.to_rect());
                if bounds.height() < RULE_THICKNESS && bounds.width() >= RULE_THICKNESS {
                    let y = (bounds.y1 + bounds.y2) / 2.0;
                    segments.push(LineSegment {
                        x1: bounds.x1.min(bounds.x2),
                        y1: y,
                        x2: bounds.x1.max(bounds.x2),
                        y2: y,
                    });
                } else if bounds.width() < RULE_THICKNESS && bounds.height() >= RULE_THICKNESS {
                    let x = (bounds.x1 + bounds.x2) / 2.0;
                    segments.push(LineSegment {
                        x1: x,
                        y1: bounds.y1.min(bounds.y2),
                        x2: x,
                        y2: bounds.y1.max(bounds.y2),
                    });
                }
            }
        }

        trace!(page = page + 1, segments = segments.len(), "Collected ruling lines");
        Ok(segments)
    }

    fn page_annotations(&self, page: usize) -> BackendResult<Vec<PdfObject>> {
        let Some(annots) = self.page_dict(page)?.get("/Annots") else {
            return Ok(Vec::new());
        };
        if annots.get_type() != QPdfObjectType::Array {
            return Err(BackendError::Page {
                page: page + 1,
                message: format!("/Annots is a {:?}", annots.get_type()),
            });
        }
        let annots: QPdfArray = annots.into();
        Ok(annots
            .iter()
            .map(|annot| convert_object(&annot, SHALLOW_DEPTH))
            .collect())
    }

    fn page_object_id(&self, page: usize) -> Option<ObjectId> {
        self.pages.get(page).and_then(object_id)
    }

    fn form_fields(&self) -> BackendResult<Vec<PdfObject>> {
        let fields = self
            .structure
            .get_root()
            .and_then(|root| root.get("/AcroForm"))
            .filter(|form| form.get_type() == QPdfObjectType::Dictionary)
            .and_then(|form| QPdfDictionary::from(form).get("/Fields"));

        match fields {
            Some(fields) if fields.get_type() == QPdfObjectType::Array => {
                let fields: QPdfArray = fields.into();
                Ok(fields
                    .iter()
                    .map(|field| convert_object(&field, SHALLOW_DEPTH))
                    .collect())
            }
            Some(other) => Err(BackendError::Object {
                message: format!("/AcroForm /Fields is a {:?}", other.get_type()),
            }),
            None => Ok(Vec::new()),
        }
    }

    fn stream_filters(&self) -> BackendResult<Vec<PdfObject>> {
        filters_of(&self.structure)
    }

    fn document_info(&self) -> BackendResult<DocumentInfo> {
        let info = match self
            .structure
            .get_trailer()
            .and_then(|trailer| trailer.get("/Info"))
        {
            Some(info) => match convert_object(&info, SHALLOW_DEPTH) {
                PdfObject::Dictionary(dict) => dict,
                other => {
                    warn!(kind = other.type_name(), "Ignoring malformed /Info entry");
                    Dictionary::new()
                }
            },
            None => Dictionary::new(),
        };

        Ok(DocumentInfo {
            version: Some(self.structure.get_pdf_version()),
            encrypted: self.structure.is_encrypted(),
            info,
        })
    }
}

impl NativeFontEnumeration for PdfiumBackend<'_> {
    fn page_fonts(&self, page: usize) -> BackendResult<Vec<BackendResult<NativeFont>>> {
        self.page_fonts_from_pdfium(page)
    }
}
