use tracing::trace;

use super::descriptor::DescriptorParts;
use super::{FontAccumulator, FontResolutionResult, FontStrategy, FontStrategyKind};
use crate::backend::DocumentBackend;
use crate::error::UnitFailure;

/// Uses the backend's own font enumeration, when it has one.
pub struct BackendNative;

impl FontStrategy for BackendNative {
    fn kind(&self) -> FontStrategyKind {
        FontStrategyKind::BackendNative
    }

    fn is_available(&self, document: &dyn DocumentBackend) -> bool {
        document.native_fonts().is_some()
    }

    fn resolve(&self, document: &dyn DocumentBackend) -> FontResolutionResult {
        let mut acc = FontAccumulator::new();
        let Some(enumeration) = document.native_fonts() else {
            return acc.finish(self.kind());
        };

        for index in 0..document.page_count() {
            let page = index + 1;
            let fonts = match enumeration.page_fonts(index) {
                Ok(fonts) => fonts,
                Err(e) => {
                    acc.fail(UnitFailure::page(page, e.detail()));
                    continue;
                }
            };

            trace!(page, fonts = fonts.len(), "Native font enumeration");
            for font in fonts {
                match font {
                    Ok(font) => {
                        let descriptor = DescriptorParts {
                            base_font: Some(font.base_font),
                            subtype: font.subtype,
                            encoding: font.encoding,
                            font_name: None,
                            embedded: font.embedded,
                        };
                        acc.observe(descriptor.render(), page);
                    }
                    Err(e) => acc.fail(UnitFailure::font_parsing(page, e.detail())),
                }
            }
        }

        acc.finish(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NativeFont;
    use crate::backend::fixture::{FixtureDocument, native_font};

    #[test]
    fn test_unavailable_without_capability() {
        assert!(!BackendNative.is_available(&FixtureDocument::new(1)));
        assert!(BackendNative.is_available(&FixtureDocument::new(1).with_native_fonts()));
    }

    #[test]
    fn test_descriptors_include_encoding_and_embedding() {
        let mut doc = FixtureDocument::new(2).with_native_fonts();
        doc.page_mut(1).native_fonts = Ok(vec![Ok(NativeFont {
            encoding: Some("WinAnsiEncoding".to_string()),
            ..native_font("Arial", "TrueType", true)
        })]);
        doc.page_mut(2).native_fonts = Ok(vec![
            Ok(native_font("Courier", "Type1", false)),
            Ok(native_font("Courier", "Type1", false)),
        ]);

        let result = BackendNative.resolve(&doc);
        assert_eq!(
            result.fonts.keys().collect::<Vec<_>>(),
            vec![
                "Arial (TrueType) - WinAnsiEncoding [Embedded]",
                "Courier (Type1)"
            ]
        );
        assert_eq!(result.fonts["Courier (Type1)"].pages, vec![2]);
    }

    #[test]
    fn test_unknown_subtype() {
        let mut doc = FixtureDocument::new(1).with_native_fonts();
        doc.page_mut(1).native_fonts = Ok(vec![Ok(NativeFont {
            subtype: None,
            ..native_font("Symbol", "Type1", false)
        })]);

        let result = BackendNative.resolve(&doc);
        assert!(result.fonts.contains_key("Symbol (Unknown)"));
    }

    #[test]
    fn test_bad_font_and_bad_page_are_isolated() {
        let mut doc = FixtureDocument::new(3).with_native_fonts();
        doc.page_mut(1).native_fonts = Ok(vec![
            Err("corrupt font program".to_string()),
            Ok(native_font("Helvetica", "Type1", false)),
        ]);
        doc.page_mut(2).native_fonts = Err("page tree broken".to_string());
        doc.page_mut(3).native_fonts = Ok(vec![Ok(native_font("Helvetica", "Type1", false))]);

        let result = BackendNative.resolve(&doc);
        assert_eq!(result.fonts["Helvetica (Type1)"].pages, vec![1, 3]);
        assert_eq!(
            result.errors,
            vec![
                "Page 1, font parsing: corrupt font program",
                "Page 2: page tree broken"
            ]
        );
    }
}
