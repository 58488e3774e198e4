//! OCR every image of a dataset's rows into the markdown tree.

use crate::batch::ERROR_REPORT_FILE;
use crate::dataset::source::{
    parquet_rows, row_id, row_images, row_output_path, should_process_row, DatasetConfig,
    RowSource, SubsetConfig,
};
use crate::error::{ItemError, OcrError};
use crate::fsutil;
use crate::pipeline::ocr::OcrClient;
use image::DynamicImage;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Per-subset counts. `total` counts images found in accepted rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubsetStats {
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    pub error: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct DatasetReport {
    pub subsets: BTreeMap<String, SubsetStats>,
    /// Failed images (`subset/split/row/column`) and failed splits
    /// (`subset/split`).
    pub errors: Vec<ItemError>,
    pub error_report: Option<PathBuf>,
    pub duration_ms: u64,
}

impl DatasetReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// OCR the configured subsets and splits of a dataset.
///
/// The server must be healthy first. A split that cannot be listed or read
/// and an image whose OCR fails are recorded in the report; everything else
/// carries on. Existing markdown is kept unless `config.overwrite`.
pub async fn process_dataset(
    client: &OcrClient,
    config: &DatasetConfig,
    source: &dyn RowSource,
) -> Result<DatasetReport, OcrError> {
    let start = Instant::now();
    config.validate()?;
    client.ensure_available().await?;

    let mut report = DatasetReport::default();
    for subset in &config.subsets {
        info!("Processing subset: {}", subset.name);
        let mut stats = SubsetStats::default();

        for split in &subset.splits {
            let outcome =
                process_split(client, config, subset, split, source, &mut stats, &mut report.errors)
                    .await;
            if let Err(e) = outcome {
                warn!("Subset '{}', split '{}': {}", subset.name, split, e);
                report
                    .errors
                    .push(ItemError::new(format!("{}/{}", subset.name, split), &e));
            }
        }

        info!(
            "Subset '{}': {} processed, {} skipped, {} failed",
            subset.name, stats.success, stats.skipped, stats.error
        );
        report.subsets.insert(subset.name.clone(), stats);
    }

    if !report.errors.is_empty() {
        let path = config.output_dir.join(ERROR_REPORT_FILE);
        let body: String = report.errors.iter().map(|e| format!("{e}\n")).collect();
        fsutil::write_atomic(&path, body.as_bytes())?;
        report.error_report = Some(path);
    }
    report.duration_ms = start.elapsed().as_millis() as u64;
    Ok(report)
}

async fn process_split(
    client: &OcrClient,
    config: &DatasetConfig,
    subset: &SubsetConfig,
    split: &str,
    source: &dyn RowSource,
    stats: &mut SubsetStats,
    errors: &mut Vec<ItemError>,
) -> Result<(), OcrError> {
    info!("Processing {}/{}", subset.name, split);
    let limit = config.row_limit();
    let mut index = 0usize;

    for name in source.list(&subset.name, split)? {
        if limit.is_some_and(|max| index >= max) {
            break;
        }
        let path = source.fetch(&name)?;

        for row in parquet_rows(&path)? {
            if limit.is_some_and(|max| index >= max) {
                break;
            }
            let row = row?;
            let row_index = index;
            index += 1;

            if !should_process_row(&row, subset) {
                continue;
            }
            let id = row_id(&row, row_index);

            for (column, image) in row_images(&row, subset) {
                stats.total += 1;
                let label = format!("{}/{}/{}/{}", subset.name, split, id, column);
                let out = row_output_path(&config.output_dir, &subset.name, split, &id, &column);

                if out.exists() && !config.overwrite {
                    stats.skipped += 1;
                    continue;
                }
                match ocr_to_file(client, &image, &out).await {
                    Ok(()) => {
                        stats.success += 1;
                        info!("Processed {} -> {}", label, out.display());
                    }
                    Err(e) => {
                        stats.error += 1;
                        warn!("Error processing {}: {}", label, e);
                        errors.push(ItemError::new(label, &e));
                    }
                }
            }
        }
    }
    Ok(())
}

async fn ocr_to_file(client: &OcrClient, image: &DynamicImage, out: &Path) -> Result<(), OcrError> {
    let text = client.process_image(image).await?;
    fsutil::write_atomic(out, text.as_bytes())
}
