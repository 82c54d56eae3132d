use std::path::Path;

use ankigen_core::error::AppError;
use ankigen_core::extract::ImageOcr;
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::info;

use crate::llm::{ChatBackend, ChatMessage, ChatRole};

const OCR_PROMPT: &str = "Transcribe all text visible in this image exactly as written, \
preserving line breaks and headings. Reply with the text only, without commentary.";

/// OCR through a vision-capable chat model: one user turn carrying the image.
pub struct VisionOcr<'a> {
    backend: &'a dyn ChatBackend,
    model: String,
}

impl<'a> VisionOcr<'a> {
    pub fn new(backend: &'a dyn ChatBackend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }
}

impl ImageOcr for VisionOcr<'_> {
    fn image_to_text(&self, image: &[u8], path: &Path) -> Result<String, AppError> {
        info!(path = %path.display(), model = %self.model, bytes = image.len(), "running OCR");
        let msg =
            ChatMessage::new(ChatRole::User, OCR_PROMPT).with_images(vec![STANDARD.encode(image)]);
        self.backend.complete(&self.model, &[msg]).map_err(|e| {
            AppError::new("EXTRACT_OCR_FAILED", "Failed to read text from image")
                .with_details(format!("path={}; err={e}", path.display()))
                .with_retryable(e.retryable)
        })
    }
}
