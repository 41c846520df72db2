//! Error types for the export pipeline.
//!
//! Two failure families exist and they behave very differently.
//! Configuration problems ([`ExportError::ImproperlyConfigured`] and
//! friends) surface when routes are registered, before any export request
//! can be served. Encoding problems are terminal for the one request that
//! hits them: the streamed body simply stops, and the client receives a
//! truncated download. That truncation is an inherent property of streaming
//! responses; callers who need atomicity would have to buffer the whole
//! document, which this crate deliberately never does.

use thiserror::Error;

/// Raised by a row source when a referenced related record no longer
/// exists. Recovered at the row-source boundary: the affected field is
/// exported as an empty value and the export continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("related object does not exist: {0}")]
pub struct DoesNotExist(pub String);

/// The primary error type for export configuration and encoding.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The export configuration is invalid (no formats, no columns,
    /// duplicate format slugs, a multi-byte delimiter, ...). Raised at
    /// route-registration time.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// The requested output encoding label is not a known encoding.
    #[error("Unknown output encoding label: {0:?}")]
    UnknownEncoding(String),

    /// A character in the current line cannot be represented in the target
    /// encoding. Terminal for the whole export request.
    #[error("character {character:?} is not representable in {encoding}")]
    Unencodable {
        /// The offending character.
        character: char,
        /// The canonical name of the target encoding.
        encoding: &'static str,
    },

    /// The delimited-text writer rejected a record.
    #[error("Delimited-text write error: {0}")]
    Csv(#[from] csv::Error),

    /// An I/O error while draining the line buffer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience type alias for `Result<T, ExportError>`.
pub type ExportResult<T> = Result<T, ExportError>;
