pub mod conversation;
pub mod generate;
pub mod llm;
pub mod ocr;
pub mod ollama;
pub mod transcript;
