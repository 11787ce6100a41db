//! Errors that stop an invoice from being produced.

use std::io;
use std::path::PathBuf;

use crate::model::LayoutError;

/// Errors that can occur while assembling and writing the invoice.
///
/// Missing images are not errors: they are logged and the document is produced without them.
#[derive(Debug)]
pub enum InvoiceError {
    /// The required font family could not be loaded.
    Fonts(genpdf::error::Error),
    /// The layout plan is structurally invalid.
    Layout(LayoutError),
    /// `genpdf` failed while laying out or serializing the document.
    Render(genpdf::error::Error),
    /// The rendered document could not be written to disk.
    Write {
        /// Destination that could not be written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
}

impl InvoiceError {
    /// Returns whether the failure happened while writing the output file.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

impl From<LayoutError> for InvoiceError {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl std::fmt::Display for InvoiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fonts(err) => write!(f, "Failed to load fonts: {err}"),
            Self::Layout(err) => write!(f, "Invalid layout: {err}"),
            Self::Render(err) => write!(f, "Failed to render PDF: {err}"),
            Self::Write { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for InvoiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fonts(err) | Self::Render(err) => Some(err),
            Self::Layout(err) => Some(err),
            Self::Write { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn write_errors_name_the_path_and_keep_the_source() {
        let err = InvoiceError::Write {
            path: PathBuf::from("pdfs/out.pdf"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        };
        assert!(err.is_io());
        assert_eq!(
            err.to_string(),
            "Failed to write pdfs/out.pdf: no such directory"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn layout_errors_convert() {
        let err = InvoiceError::from(LayoutError::EmptyHeadings);
        assert!(!err.is_io());
        assert_eq!(
            err.to_string(),
            "Invalid layout: table list has no headings"
        );
    }
}
