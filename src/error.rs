//! Error types for statement extraction.
//!
//! Only the "cannot proceed at all" cases are errors. Bad tokens, bad pages
//! and empty statements degrade to zeros, skipped pages or an empty table.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The PDF container could not be opened or parsed.
    #[error("No se pudo leer el PDF: {0}")]
    PdfUnreadable(String),

    /// Input is not a PDF (magic bytes, size limits).
    #[error("PDF inválido: {0}")]
    InvalidPdf(String),

    /// A page has no text layer and the OCR toolchain is missing.
    #[error("OCR no disponible: falta instalar {}", missing.join(", "))]
    OcrUnavailable { missing: Vec<String> },

    /// OCR toolchain present but recognition failed after the degraded retry.
    #[error("Falló el OCR: {0}")]
    OcrFailed(String),

    #[error("No se pudo detectar el banco emisor del estado de cuenta")]
    UnknownIssuer,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn ocr_unavailable<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OcrUnavailable {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// True when the caller should tell the user to install OCR tooling.
    pub fn is_ocr_unavailable(&self) -> bool {
        matches!(self, Self::OcrUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
