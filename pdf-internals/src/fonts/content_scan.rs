use tracing::trace;

use super::descriptor::DescriptorParts;
use super::operators::scan_font_operators;
use super::{FontAccumulator, FontResolutionResult, FontStrategy, FontStrategyKind};
use crate::backend::DocumentBackend;
use crate::error::UnitFailure;

/// Last resort: find `Tf` operators in the page content and look the
/// selected names up in the page's font resources.
pub struct ContentStreamScan;

impl FontStrategy for ContentStreamScan {
    fn kind(&self) -> FontStrategyKind {
        FontStrategyKind::ContentStreamScan
    }

    fn resolve(&self, document: &dyn DocumentBackend) -> FontResolutionResult {
        let mut acc = FontAccumulator::new();

        for index in 0..document.page_count() {
            let page = index + 1;

            let content = match document.page_content(index) {
                Ok(content) => content,
                Err(e) => {
                    acc.fail(UnitFailure::content_stream(page, e.detail()));
                    continue;
                }
            };
            let names = scan_font_operators(&content);
            if names.is_empty() {
                continue;
            }

            let resources = match document.page_resources(index) {
                Ok(resources) => resources,
                Err(e) => {
                    acc.fail(UnitFailure::page(page, e.detail()));
                    continue;
                }
            };
            let fonts = resources.as_ref().and_then(|r| r.get_dict("Font"));

            for name in names {
                // A selected name with no usable binding is skipped.
                let Some(font) = fonts.and_then(|fonts| fonts.get_dict(&name)) else {
                    trace!(page, font = %name, "Unresolved font resource");
                    continue;
                };
                acc.observe(DescriptorParts::basic(font).render(), page);
            }
        }

        acc.finish(self.kind())
    }
}
