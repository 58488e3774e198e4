//! Prompts sent to the OCR model.
//!
//! DeepSeek-OCR is trained on short task instructions rather than long rule
//! lists, so the default is a single sentence. Callers can override it via
//! [`crate::config::OcrConfig::prompt`].

/// Default instruction sent with every page image.
pub const DEFAULT_OCR_PROMPT: &str =
    "Extract all text from this image and return it in markdown format.";
