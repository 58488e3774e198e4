//! PDF rasterisation: every page of a PDF to a `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and does CPU-heavy work. `tokio::task::spawn_blocking` moves
//! rendering onto the blocking pool so Tokio worker threads never stall.
//!
//! ## Library binding
//!
//! `PDFIUM_LIB_PATH` may name the shared library itself or the directory
//! holding it. Without it the system library is used.

use crate::error::OcrError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Bind to pdfium from `PDFIUM_LIB_PATH` or the system library.
pub fn bind_pdfium() -> Result<Pdfium, OcrError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(raw) => {
            let path = PathBuf::from(raw);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
                .map_err(|e| OcrError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e)))?
        }
        None => Pdfium::bind_to_system_library()
            .map_err(|e| OcrError::PdfiumBindingFailed(format!("system library: {:?}", e)))?,
    };
    Ok(Pdfium::new(bindings))
}

/// Render every page of `pdf_path` at `dpi`.
///
/// Returns `(page_number, image)` pairs with 1-based page numbers, in page
/// order.
pub async fn render_pdf_pages(
    pdf_path: &Path,
    dpi: u32,
) -> Result<Vec<(u32, DynamicImage)>, OcrError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || render_pdf_pages_blocking(&path, dpi))
        .await
        .map_err(|e| OcrError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pdf_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
) -> Result<Vec<(u32, DynamicImage)>, OcrError> {
    let pdfium = bind_pdfium()?;
    let render_err = |detail: String| OcrError::PdfRenderFailed {
        path: pdf_path.to_path_buf(),
        detail,
    };

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| render_err(format!("{:?}", e)))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages ({})", pages.len(), pdf_path.display());

    let render_config =
        PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / PDF_POINTS_PER_INCH);

    let mut results = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let page_number = idx as u32 + 1;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| render_err(format!("page {}: {:?}", page_number, e)))?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_number,
            image.width(),
            image.height()
        );
        results.push((page_number, image));
    }

    Ok(results)
}
