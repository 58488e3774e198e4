//! Single-file and directory-tree OCR into markdown files.
//!
//! Output naming:
//!
//! ```text
//! scan.png        → scan.md
//! report.pdf      → report_page001.md, report_page002.md, ...
//! in/a/b/x.pdf    → out/a/b/x_page001.md ...   (batch mirrors the tree)
//! ```
//!
//! Existing outputs are kept unless `overwrite` is set, which makes an
//! interrupted batch resumable page by page.

use crate::error::{ItemError, OcrError};
use crate::fsutil;
use crate::output::{BatchReport, BatchStats, FileResult};
use crate::pipeline::input::{discover_inputs, resolve_local, InputKind};
use crate::pipeline::ocr::OcrClient;
use crate::pipeline::render::render_pdf_pages;
use crate::progress::BatchProgressCallback;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Name of the failure list written into the batch output directory.
pub const ERROR_REPORT_FILE: &str = "errors.txt";

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<stem>_page<NNN>.md`
pub fn page_file_name(stem: &str, page: u32) -> String {
    format!("{stem}_page{page:03}.md")
}

/// Where page `page` of `pdf` goes for `ocr process`.
///
/// * no `output` → next to the PDF
/// * `output` is a directory, or has no extension → inside it
/// * otherwise `output` is a file name template: `out.md` → `out_page001.md`
pub fn page_output_path(pdf: &Path, page: u32, output: Option<&Path>) -> PathBuf {
    match output {
        None => pdf
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(page_file_name(&stem_of(pdf), page)),
        Some(out) if out.is_dir() || out.extension().is_none() => {
            out.join(page_file_name(&stem_of(pdf), page))
        }
        Some(out) => {
            let ext = out
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            out.parent()
                .unwrap_or_else(|| Path::new(""))
                .join(format!("{}_page{:03}.{}", stem_of(out), page, ext))
        }
    }
}

fn write_markdown(path: &Path, text: &str) -> Result<(), OcrError> {
    fsutil::write_atomic(path, text.as_bytes())?;
    debug!("Saved {}", path.display());
    Ok(())
}

async fn ocr_pdf<F>(
    client: &OcrClient,
    pdf: &Path,
    dest: F,
    progress: &dyn BatchProgressCallback,
) -> Result<FileResult, OcrError>
where
    F: Fn(u32) -> PathBuf,
{
    let start = Instant::now();
    let overwrite = client.config().overwrite;
    let pages = render_pdf_pages(pdf, client.config().dpi).await?;
    let total = pages.len();

    let mut result = FileResult {
        input: pdf.to_path_buf(),
        ..Default::default()
    };
    for (page_num, image) in pages {
        let out = dest(page_num);
        if out.exists() && !overwrite {
            debug!("Keeping existing {}", out.display());
            result.skipped_pages += 1;
            result.outputs.push(out);
            continue;
        }
        let text = client.process_image(&image).await?;
        write_markdown(&out, &text)?;
        progress.on_page_complete(pdf, page_num, total);
        result.ocr_pages += 1;
        result.outputs.push(out);
    }
    result.duration_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

async fn ocr_image(
    client: &OcrClient,
    image: &Path,
    dest: Option<PathBuf>,
) -> Result<FileResult, OcrError> {
    let start = Instant::now();
    let mut result = FileResult {
        input: image.to_path_buf(),
        ..Default::default()
    };

    match dest {
        Some(out) if out.exists() && !client.config().overwrite => {
            debug!("Keeping existing {}", out.display());
            result.skipped_pages = 1;
            result.outputs.push(out);
        }
        Some(out) => {
            let text = client.process_image_file(image).await?;
            write_markdown(&out, &text)?;
            result.ocr_pages = 1;
            result.outputs.push(out);
        }
        None => {
            result.text = Some(client.process_image_file(image).await?);
            result.ocr_pages = 1;
        }
    }
    result.duration_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

/// OCR one image or PDF.
///
/// A PDF always produces one markdown file per page (see
/// [`page_output_path`]). An image is written to `output` when given,
/// otherwise its text is returned in [`FileResult::text`].
pub async fn process_file(
    client: &OcrClient,
    input: &Path,
    output: Option<&Path>,
    progress: &dyn BatchProgressCallback,
) -> Result<FileResult, OcrError> {
    match resolve_local(input)? {
        InputKind::Pdf => {
            info!("Converting PDF: {}", input.display());
            ocr_pdf(client, input, |n| page_output_path(input, n, output), progress).await
        }
        InputKind::Image => {
            info!("Processing image: {}", input.display());
            ocr_image(client, input, output.map(Path::to_path_buf)).await
        }
    }
}

/// OCR every supported file under `input_dir` into `output_dir`, mirroring
/// the directory structure.
///
/// The server must be healthy before anything starts
/// ([`OcrError::ServerNotAvailable`] otherwise). After that a failing file
/// is recorded as an [`ItemError`] and the batch moves on; when anything
/// failed, `errors.txt` in `output_dir` lists one `path: error` line each.
pub async fn process_batch(
    client: &OcrClient,
    input_dir: &Path,
    output_dir: &Path,
    progress: &dyn BatchProgressCallback,
) -> Result<BatchReport, OcrError> {
    let start = Instant::now();
    let files = discover_inputs(input_dir)?;
    let total = files.len();
    info!("Found {} file(s) to process in {}", total, input_dir.display());

    let mut report = BatchReport::default();
    report.stats.total_files = total;
    if files.is_empty() {
        warn!("No images or PDFs found in {}", input_dir.display());
        return Ok(report);
    }

    client.ensure_available().await?;
    progress.on_batch_start(total);

    for (i, file) in files.iter().enumerate() {
        let index = i + 1;
        progress.on_file_start(file, index, total);

        let rel_parent = file
            .strip_prefix(input_dir)
            .ok()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""));
        let out_dir = output_dir.join(rel_parent);
        let stem = stem_of(file);

        let outcome = match resolve_local(file) {
            Ok(InputKind::Pdf) => {
                ocr_pdf(client, file, |n| out_dir.join(page_file_name(&stem, n)), progress).await
            }
            Ok(InputKind::Image) => {
                ocr_image(client, file, Some(out_dir.join(format!("{stem}.md")))).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) if result.is_skipped() => {
                report.stats.skipped_files += 1;
                progress.on_file_skipped(file, index, total);
                report.results.push(result);
            }
            Ok(result) => {
                report.stats.processed_files += 1;
                if result.input.extension().is_some_and(|e| e.eq_ignore_ascii_case("pdf")) {
                    report.stats.pdf_pages += result.ocr_pages;
                }
                progress.on_file_complete(file, index, total, result.ocr_pages);
                report.results.push(result);
            }
            Err(e) => {
                warn!("{}: {}", file.display(), e);
                report.stats.failed_files += 1;
                let item = ItemError::new(file.clone(), &e);
                progress.on_file_error(file, index, total, &item.detail);
                report.errors.push(item);
            }
        }
    }

    if !report.errors.is_empty() {
        let path = output_dir.join(ERROR_REPORT_FILE);
        let body: String = report.errors.iter().map(|e| format!("{e}\n")).collect();
        fsutil::write_atomic(&path, body.as_bytes())?;
        report.error_report = Some(path);
    }

    report.stats.duration_ms = start.elapsed().as_millis() as u64;
    progress.on_batch_complete(total, total - report.stats.failed_files);
    info!(
        "Batch complete: {} processed, {} skipped, {} failed",
        report.stats.processed_files, report.stats.skipped_files, report.stats.failed_files
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_are_zero_padded() {
        assert_eq!(page_file_name("report", 7), "report_page007.md");
        assert_eq!(page_file_name("report", 1234), "report_page1234.md");
    }

    #[test]
    fn page_output_next_to_input() {
        let p = page_output_path(Path::new("/data/in/report.pdf"), 2, None);
        assert_eq!(p, PathBuf::from("/data/in/report_page002.md"));
    }

    #[test]
    fn page_output_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let p = page_output_path(Path::new("report.pdf"), 1, Some(dir.path()));
        assert_eq!(p, dir.path().join("report_page001.md"));

        let p = page_output_path(Path::new("report.pdf"), 1, Some(Path::new("out/pages")));
        assert_eq!(p, PathBuf::from("out/pages/report_page001.md"));
    }

    #[test]
    fn page_output_from_file_template() {
        let p = page_output_path(Path::new("report.pdf"), 12, Some(Path::new("out/result.md")));
        assert_eq!(p, PathBuf::from("out/result_page012.md"));
    }
}
