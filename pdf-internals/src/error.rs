use std::path::PathBuf;

use thiserror::Error;

/// Longest message kept in a unit-failure diagnostic.
pub const MESSAGE_LIMIT: usize = 50;

/// Top-level error: anything that aborts a whole command.
#[derive(Error, Debug)]
pub enum InspectError {
    #[error("File '{}' not found", path.display())]
    NotFound { path: PathBuf },

    #[error("'{}' is not a PDF file", path.display())]
    NotAPdf { path: PathBuf },

    #[error("PDF backend error")]
    Backend(#[from] BackendError),

    #[error("IO error")]
    Io(#[source] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to serialize report")]
    Serialization(#[source] serde_json::Error),
}

/// Errors raised by a document backend. Page numbers are 1-based.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to load PDFium library: {message}")]
    Library { message: String },

    #[error("Failed to load document: {source}")]
    Load {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("Failed to read page {page}: {message}")]
    Page { page: usize, message: String },

    #[error("Failed to render page {page}: {message}")]
    Render { page: usize, message: String },

    #[error("Failed to read object: {message}")]
    Object { message: String },
}

impl BackendError {
    /// The underlying message without the page prefix, for diagnostics that
    /// already name the page.
    pub fn detail(&self) -> String {
        match self {
            Self::Page { message, .. }
            | Self::Render { message, .. }
            | Self::Object { message }
            | Self::Library { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// A failure scoped to one unit of work: a font, an image, a content stream,
/// an annotation or a page.
///
/// Never fatal: the enclosing pass records it and moves on. The `Display`
/// output is the diagnostic string stored in result error lists. Page numbers
/// are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitFailure {
    #[error("Page {page}: {message}")]
    Page { page: usize, message: String },

    #[error("Page {page}, font parsing: {message}")]
    FontParsing { page: usize, message: String },

    #[error("Page {page}, font '{key}': {message}")]
    FontEntry {
        page: usize,
        key: String,
        message: String,
    },

    #[error("Page {page}, content stream: {message}")]
    ContentStream { page: usize, message: String },

    #[error("Page {page}, image {index}: {message}")]
    Image {
        page: usize,
        index: usize,
        message: String,
    },

    #[error("Page {page}, annotation: {message}")]
    Annotation { page: usize, message: String },

    #[error("{context}: {message}")]
    Document { context: String, message: String },
}

impl UnitFailure {
    pub fn page(page: usize, message: impl ToString) -> Self {
        Self::Page {
            page,
            message: truncate_message(message),
        }
    }

    pub fn font_parsing(page: usize, message: impl ToString) -> Self {
        Self::FontParsing {
            page,
            message: truncate_message(message),
        }
    }

    pub fn font_entry(page: usize, key: &str, message: impl ToString) -> Self {
        Self::FontEntry {
            page,
            key: key.to_string(),
            message: truncate_message(message),
        }
    }

    pub fn content_stream(page: usize, message: impl ToString) -> Self {
        Self::ContentStream {
            page,
            message: truncate_message(message),
        }
    }

    pub fn image(page: usize, index: usize, message: impl ToString) -> Self {
        Self::Image {
            page,
            index,
            message: truncate_message(message),
        }
    }

    pub fn annotation(page: usize, message: impl ToString) -> Self {
        Self::Annotation {
            page,
            message: truncate_message(message),
        }
    }

    pub fn document(context: &str, message: impl ToString) -> Self {
        Self::Document {
            context: context.to_string(),
            message: truncate_message(message),
        }
    }
}

/// One output image that could not be serialized.
#[derive(Error, Debug)]
#[error("Failed to write {}", path.display())]
pub struct WriteFailure {
    pub path: PathBuf,
    #[source]
    pub source: image::ImageError,
}

/// Cut a diagnostic down to [`MESSAGE_LIMIT`] characters.
pub fn truncate_message(message: impl ToString) -> String {
    message.to_string().chars().take(MESSAGE_LIMIT).collect()
}

/// Result type alias for whole-command operations
pub type InspectResult<T> = Result<T, InspectError>;

/// Result type alias for backend calls
pub type BackendResult<T> = Result<T, BackendError>;
