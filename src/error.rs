//! Error types for the hybridpdf library.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for hybridpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while converting a PDF.
///
/// Document-level errors (see [`Error::is_fatal`]) abort a conversion.
/// Everything else is raised by a single backend call on a single page and
/// is recorded on that page as a [`PageIssue`](crate::model::PageIssue).
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// The document has no pages or could not be read at all.
    #[error("Empty document: {0}")]
    EmptyDocument(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// The native-text probe used for classification failed.
    #[error("Classification probe failed: {0}")]
    ClassificationProbe(String),

    /// A required extraction technique cannot run.
    #[error("Backend '{backend}' unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// A backend ran and reported an error.
    #[error("Backend '{backend}' failed: {message}")]
    BackendFailure { backend: String, message: String },

    /// A backend call did not return in time.
    #[error("Backend '{backend}' timed out after {elapsed:?}")]
    BackendTimeout { backend: String, elapsed: Duration },

    /// The LLM service cannot be reached or is not configured.
    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    /// The LLM call did not return in time.
    #[error("LLM timed out after {0:?}")]
    LlmTimeout(Duration),

    /// The LLM answered with something that is not a usable fragment.
    #[error("Invalid LLM response: {0}")]
    LlmResponse(String),

    /// Error decoding or encoding image data.
    #[error("Image encoding error: {0}")]
    ImageEncode(String),

    /// Error during rendering.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Invalid pipeline configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns true for errors that abort the whole conversion.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::UnknownFormat
                | Error::UnsupportedVersion(_)
                | Error::PdfParse(_)
                | Error::Encrypted
                | Error::EmptyDocument(_)
                | Error::Config(_)
        )
    }

    pub(crate) fn failure(backend: impl Into<String>, message: impl ToString) -> Self {
        Error::BackendFailure {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn unavailable(backend: impl Into<String>, reason: impl ToString) -> Self {
        Error::BackendUnavailable {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageEncode(err.to_string())
    }
}
