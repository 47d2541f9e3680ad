use tracing::trace;

use super::descriptor::DescriptorParts;
use super::{FontAccumulator, FontResolutionResult, FontStrategy, FontStrategyKind};
use crate::backend::{DocumentBackend, PdfObject};
use crate::error::UnitFailure;

/// Reads each page's /Resources /Font dictionary directly.
pub struct StructuredResourceWalk;

impl FontStrategy for StructuredResourceWalk {
    fn kind(&self) -> FontStrategyKind {
        FontStrategyKind::StructuredResourceWalk
    }

    fn resolve(&self, document: &dyn DocumentBackend) -> FontResolutionResult {
        let mut acc = FontAccumulator::new();

        for index in 0..document.page_count() {
            let page = index + 1;
            let resources = match document.page_resources(index) {
                Ok(Some(resources)) => resources,
                Ok(None) => {
                    trace!(page, "No /Resources on page");
                    continue;
                }
                Err(e) => {
                    acc.fail(UnitFailure::page(page, e.detail()));
                    continue;
                }
            };

            let fonts = match resources.get("Font") {
                None => continue,
                Some(PdfObject::Dictionary(fonts)) => fonts,
                Some(PdfObject::Unreadable(message)) => {
                    acc.fail(UnitFailure::page(page, message));
                    continue;
                }
                Some(other) => {
                    acc.fail(UnitFailure::page(
                        page,
                        format!("/Font is a {}", other.type_name()),
                    ));
                    continue;
                }
            };

            for (key, font) in fonts.iter() {
                let key = format!("/{}", key);
                match font {
                    PdfObject::Dictionary(font) => {
                        acc.observe(DescriptorParts::from_font_dict(font).render(), page);
                    }
                    PdfObject::Unreadable(message) => {
                        acc.fail(UnitFailure::font_entry(page, &key, message));
                    }
                    other => acc.fail(UnitFailure::font_entry(
                        page,
                        &key,
                        format!("expected a font dictionary, found {}", other.type_name()),
                    )),
                }
            }
        }

        acc.finish(self.kind())
    }
}
