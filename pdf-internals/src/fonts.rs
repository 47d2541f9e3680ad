//! Font resolution.
//!
//! Determines which fonts are used on which pages by trying a fixed chain of
//! inspection strategies. The first strategy that observes at least one font
//! wins and its result, errors included, is returned as-is.

pub mod content_scan;
pub mod descriptor;
pub mod native;
pub mod operators;
pub mod resource_walk;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::DocumentBackend;
use crate::error::UnitFailure;

pub use content_scan::ContentStreamScan;
pub use native::BackendNative;
pub use resource_walk::StructuredResourceWalk;

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontStrategyKind {
    BackendNative,
    StructuredResourceWalk,
    ContentStreamScan,
}

impl FontStrategyKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BackendNative => "Backend-Native",
            Self::StructuredResourceWalk => "Structured-Resource-Walk",
            Self::ContentStreamScan => "Content-Stream-Scan",
        }
    }
}

/// One descriptor and the pages it was seen on, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontObservation {
    pub descriptor: String,
    pub pages: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontResolutionResult {
    pub fonts: IndexMap<String, FontObservation>,
    pub errors: Vec<String>,
    pub strategy_used: FontStrategyKind,
    /// Every strategy came back empty; `fonts` is legitimately empty.
    pub exhausted: bool,
}

impl FontResolutionResult {
    /// Human-readable detection method, e.g. `Structured-Resource-Walk` or
    /// `Backend-Native (no fonts found)`.
    pub fn method_label(&self) -> String {
        if self.exhausted {
            format!("{} (no fonts found)", self.strategy_used.label())
        } else {
            self.strategy_used.label().to_string()
        }
    }
}

/// Per-strategy accumulator of observations and unit failures.
#[derive(Debug, Default)]
pub struct FontAccumulator {
    fonts: IndexMap<String, FontObservation>,
    errors: Vec<String>,
}

impl FontAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `descriptor` on 1-based `page`. A page is listed once per
    /// descriptor however often the font is selected on it.
    pub fn observe(&mut self, descriptor: String, page: usize) {
        let observation = self
            .fonts
            .entry(descriptor)
            .or_insert_with_key(|descriptor| FontObservation {
                descriptor: descriptor.clone(),
                pages: Vec::new(),
            });
        if !observation.pages.contains(&page) {
            observation.pages.push(page);
        }
    }

    pub fn fail(&mut self, failure: UnitFailure) {
        warn!(error = %failure, "Font inspection unit failed");
        self.errors.push(failure.to_string());
    }

    pub fn finish(self, strategy_used: FontStrategyKind) -> FontResolutionResult {
        FontResolutionResult {
            fonts: self.fonts,
            errors: self.errors,
            strategy_used,
            exhausted: false,
        }
    }
}

/// One self-contained way of finding font usage in a document.
pub trait FontStrategy {
    fn kind(&self) -> FontStrategyKind;

    /// Whether the strategy can run against this document at all.
    fn is_available(&self, _document: &dyn DocumentBackend) -> bool {
        true
    }

    fn resolve(&self, document: &dyn DocumentBackend) -> FontResolutionResult;
}

/// Ordered strategy chain.
pub struct FontResolver {
    strategies: Vec<Box<dyn FontStrategy>>,
}

impl Default for FontResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(BackendNative),
            Box::new(StructuredResourceWalk),
            Box::new(ContentStreamScan),
        ])
    }
}

impl FontResolver {
    pub fn new(strategies: Vec<Box<dyn FontStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, document: &dyn DocumentBackend) -> FontResolutionResult {
        // First empty result from a non-scan strategy, reported if nothing
        // finds any fonts.
        let mut fallback: Option<FontResolutionResult> = None;

        for strategy in &self.strategies {
            let kind = strategy.kind();
            if !strategy.is_available(document) {
                debug!(strategy = kind.label(), "Font strategy unavailable");
                continue;
            }

            let result = strategy.resolve(document);
            if !result.fonts.is_empty() {
                info!(
                    strategy = kind.label(),
                    fonts = result.fonts.len(),
                    errors = result.errors.len(),
                    "Resolved fonts"
                );
                return result;
            }

            debug!(
                strategy = kind.label(),
                errors = result.errors.len(),
                "Font strategy found no fonts"
            );
            if fallback.is_none() && kind != FontStrategyKind::ContentStreamScan {
                fallback = Some(result);
            }
        }

        info!("No fonts found by any strategy");
        let mut result = fallback.unwrap_or_else(|| {
            FontAccumulator::new().finish(FontStrategyKind::StructuredResourceWalk)
        });
        result.exhausted = true;
        result
    }
}

/// Resolve fonts with the default strategy chain.
pub fn resolve_fonts(document: &dyn DocumentBackend) -> FontResolutionResult {
    FontResolver::default().resolve(document)
}
