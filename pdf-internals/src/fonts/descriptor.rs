//! Canonical font descriptor strings.
//!
//! Format: `<BaseFont> (<Subtype>)[ - <Encoding>][ [<FontName>]][ [Embedded]]`.
//! Descriptors are compared by exact string equality.

use crate::backend::{Dictionary, PdfObject};

const UNKNOWN: &str = "Unknown";

/// The fields a strategy knows about one font.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorParts {
    pub base_font: Option<String>,
    pub subtype: Option<String>,
    pub encoding: Option<String>,
    /// /FontName from the font descriptor, shown only when it differs from
    /// the base font.
    pub font_name: Option<String>,
    pub embedded: bool,
}

impl DescriptorParts {
    /// Base font and subtype only.
    pub fn basic(font: &Dictionary) -> Self {
        Self {
            base_font: font.get("BaseFont").and_then(PdfObject::as_text),
            subtype: font.get("Subtype").and_then(PdfObject::as_text),
            ..Self::default()
        }
    }

    /// Everything readable from the font object itself, including the
    /// /FontDescriptor's /FontName.
    pub fn from_font_dict(font: &Dictionary) -> Self {
        let font_name = font
            .get_dict("FontDescriptor")
            .and_then(|descriptor| descriptor.get("FontName"))
            .and_then(PdfObject::as_text);
        Self {
            encoding: encoding_label(font.get("Encoding")),
            font_name,
            ..Self::basic(font)
        }
    }

    pub fn render(&self) -> String {
        let mut descriptor = format!(
            "{} ({})",
            self.base_font.as_deref().unwrap_or(UNKNOWN),
            self.subtype.as_deref().unwrap_or(UNKNOWN)
        );

        if let Some(encoding) = self.encoding.as_deref().filter(|e| !e.is_empty()) {
            descriptor.push_str(" - ");
            descriptor.push_str(encoding);
        }

        if let Some(font_name) = self.font_name.as_deref()
            && Some(font_name) != self.base_font.as_deref()
        {
            descriptor.push_str(&format!(" [{}]", font_name));
        }

        if self.embedded {
            descriptor.push_str(" [Embedded]");
        }

        descriptor
    }
}

/// A readable label for a font's /Encoding entry.
///
/// Predefined encodings are names. Encoding dictionaries are labelled by
/// their /BaseEncoding; a dictionary with only /Differences has no label.
pub fn encoding_label(encoding: Option<&PdfObject>) -> Option<String> {
    match encoding? {
        PdfObject::Name(name) if !name.is_empty() => Some(name.clone()),
        PdfObject::Dictionary(dict) => dict.get_name("BaseEncoding").map(str::to_string),
        _ => None,
    }
}
