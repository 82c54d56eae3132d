use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::AppError;
use crate::segment::normalize_text;

mod docx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    PlainText,
    Pdf,
    Docx,
    Image,
    Unsupported,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "txt" | "md" => SourceFormat::PlainText,
            "pdf" => SourceFormat::Pdf,
            "docx" => SourceFormat::Docx,
            "png" | "jpg" | "jpeg" => SourceFormat::Image,
            _ => SourceFormat::Unsupported,
        }
    }
}

/// Reads the text out of an image. Backed by a vision model outside this crate.
pub trait ImageOcr {
    fn image_to_text(&self, image: &[u8], path: &Path) -> Result<String, AppError>;
}

/// OCR disabled: images yield no text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOcr;

impl ImageOcr for NoOcr {
    fn image_to_text(&self, _image: &[u8], path: &Path) -> Result<String, AppError> {
        warn!(path = %path.display(), "no OCR engine configured; image yields no text");
        Ok(String::new())
    }
}

/// Extract document text without OCR. See [`extract_text_with`].
pub fn extract_text(path: &Path) -> Result<String, AppError> {
    extract_text_with(path, &NoOcr)
}

/// Extract document text, dispatching on file extension. Images go through `ocr`.
///
/// Unsupported formats yield an empty string; callers treat empty text as a terminal error.
/// Read or decode failures are `EXTRACT_FAILED`.
pub fn extract_text_with(path: &Path, ocr: &dyn ImageOcr) -> Result<String, AppError> {
    let format = SourceFormat::from_path(path);
    let text = match format {
        SourceFormat::PlainText => {
            let bytes = fs::read(path).map_err(|e| extract_failed(path, e))?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
        SourceFormat::Pdf => pdf_extract::extract_text(path).map_err(|e| extract_failed(path, e))?,
        SourceFormat::Docx => docx::extract_docx_text(path)?,
        SourceFormat::Image => {
            let bytes = fs::read(path).map_err(|e| extract_failed(path, e))?;
            ocr.image_to_text(&bytes, path)?
        }
        SourceFormat::Unsupported => {
            warn!(path = %path.display(), "unsupported input format");
            return Ok(String::new());
        }
    };

    let text = normalize_text(&text);
    info!(path = %path.display(), ?format, chars = text.chars().count(), "extracted text");
    Ok(text)
}

fn extract_failed(path: &Path, err: impl std::fmt::Display) -> AppError {
    AppError::new("EXTRACT_FAILED", "Failed to extract text from file")
        .with_details(format!("path={}; err={err}", path.display()))
}
