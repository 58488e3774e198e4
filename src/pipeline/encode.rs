//! Image encoding: `DynamicImage` → `data:image/png;base64,...` URI.
//!
//! The chat-completions API takes images as data URIs inside the JSON body.
//! PNG is lossless, which keeps rendered text crisp for the OCR model.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::error::OcrError;

/// Encode an image as a PNG data URI.
pub fn to_data_uri(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(format!("data:image/png;base64,{b64}"))
}

/// Decode an image file from disk.
pub fn load_image(path: &Path) -> Result<DynamicImage, OcrError> {
    if !path.is_file() {
        return Err(OcrError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    image::open(path).map_err(|e| OcrError::InvalidImage {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}
