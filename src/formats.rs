//! Export format configuration.
//!
//! An [`ExportFormat`] pairs a display name ("CSV", "Tab Delimited", ...)
//! with the single-character field delimiter it writes. The set of formats
//! offered by a model's admin is plain immutable configuration, fixed at
//! registration time; each configured format becomes one export route and
//! one button.

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::text::slugify;

/// One export offering: a display name plus the field delimiter it uses.
///
/// # Examples
///
/// ```
/// use exportable_admin::formats::ExportFormat;
///
/// let csv = ExportFormat::csv();
/// assert_eq!(csv.name(), "CSV");
/// assert_eq!(csv.delimiter(), ',');
/// assert_eq!(csv.slug(), "csv");
///
/// let custom = ExportFormat::new("Semicolon", ';');
/// assert_eq!(custom.slug(), "semicolon");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFormat {
    name: String,
    delimiter: char,
}

impl ExportFormat {
    /// Creates a format with the given display name and delimiter.
    pub fn new(name: impl Into<String>, delimiter: char) -> Self {
        Self {
            name: name.into(),
            delimiter,
        }
    }

    /// The comma-delimited format.
    pub fn csv() -> Self {
        Self::new("CSV", ',')
    }

    /// The tab-delimited format.
    pub fn tab() -> Self {
        Self::new("Tab Delimited", '\t')
    }

    /// The pipe-delimited format.
    pub fn pipe() -> Self {
        Self::new("Pipe", '|')
    }

    /// The default offering: comma- and tab-delimited.
    pub fn default_formats() -> Vec<Self> {
        vec![Self::csv(), Self::tab()]
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field delimiter.
    pub const fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Returns the URL slug identifying this format's export route.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Returns the delimiter as the single byte the delimited writer
    /// needs.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::ImproperlyConfigured`] when the delimiter is
    /// not a single ASCII character.
    pub fn delimiter_byte(&self) -> Result<u8, ExportError> {
        u8::try_from(u32::from(self.delimiter))
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                ExportError::ImproperlyConfigured(format!(
                    "format {:?} needs a single ASCII delimiter, got {:?}",
                    self.name, self.delimiter
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_preset() {
        let f = ExportFormat::csv();
        assert_eq!(f.name(), "CSV");
        assert_eq!(f.delimiter(), ',');
        assert_eq!(f.delimiter_byte().unwrap(), b',');
    }

    #[test]
    fn test_tab_preset() {
        let f = ExportFormat::tab();
        assert_eq!(f.name(), "Tab Delimited");
        assert_eq!(f.delimiter(), '\t');
        assert_eq!(f.slug(), "tab-delimited");
    }

    #[test]
    fn test_pipe_preset() {
        let f = ExportFormat::pipe();
        assert_eq!(f.delimiter_byte().unwrap(), b'|');
        assert_eq!(f.slug(), "pipe");
    }

    #[test]
    fn test_default_formats() {
        let formats = ExportFormat::default_formats();
        assert_eq!(formats.len(), 2);
        assert_eq!(formats[0].name(), "CSV");
        assert_eq!(formats[1].name(), "Tab Delimited");
    }

    #[test]
    fn test_custom_format_slug() {
        let f = ExportFormat::new("Semi Colon", ';');
        assert_eq!(f.slug(), "semi-colon");
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let f = ExportFormat::new("Interpunct", '·');
        let err = f.delimiter_byte().unwrap_err();
        assert!(matches!(err, ExportError::ImproperlyConfigured(_)));
        assert!(err.to_string().contains("Interpunct"));
    }

    #[test]
    fn test_serialization_round_trip() {
        let f = ExportFormat::new("CSV", ',');
        let json = serde_json::to_string(&f).unwrap();
        let back: ExportFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }
}
