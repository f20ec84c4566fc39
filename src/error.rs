use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("PDF not found: {}", .0.display())]
    PdfNotFound(PathBuf),

    #[error("PDFium error: {0}")]
    Pdfium(String),

    #[error("failed to start OCR bridge `{program}`: {source}")]
    BridgeSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR bridge exited before answering")]
    BridgeExited,

    #[error("OCR bridge sent an unreadable answer: {0}")]
    BridgeProtocol(String),

    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<pdfium_render::prelude::PdfiumError> for Error {
    fn from(err: pdfium_render::prelude::PdfiumError) -> Self {
        Error::Pdfium(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
