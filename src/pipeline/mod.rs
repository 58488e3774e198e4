//! Pipeline stages for image/PDF → markdown OCR.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr
//! (path)    (pdfium)   (base64)   (chat/completions)
//! ```
//!
//! 1. [`input`]  — classify files (image vs PDF) and discover them in a tree
//! 2. [`render`] — rasterise PDF pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`] — PNG-encode each `DynamicImage` into a data URI
//! 4. [`ocr`]    — health check and the chat-completions call with
//!    retry/backoff; the only stage with network I/O

pub mod encode;
pub mod input;
pub mod ocr;
pub mod render;
