//! Integration tests for markdown → parquet export.
//!
//! Files are written into temp directories and read back with the parquet
//! arrow reader to check schema and content.

use arrow_array::cast::AsArray;
use arrow_array::types::{Int32Type, Int64Type};
use arrow_array::{Array, RecordBatch};
use arrow_schema::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::path::{Path, PathBuf};
use vlm_ocr::dataset::shard::{estimate_bytes, plan_shards, ShardPlan};
use vlm_ocr::dataset::{collect, DATASET_DIR};
use vlm_ocr::{DatasetExporter, ExportConfig, OcrError};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn read_parquet(path: &Path) -> Vec<RecordBatch> {
    let file = std::fs::File::open(path).unwrap();
    ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn ids(path: &Path) -> Vec<String> {
    read_parquet(path)
        .iter()
        .flat_map(|b| {
            b.column_by_name("id")
                .unwrap()
                .as_string::<i32>()
                .iter()
                .map(|v| v.unwrap().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn exporter(root: &Path) -> DatasetExporter {
    DatasetExporter::new(root, ExportConfig::default())
}

// ── Collector ────────────────────────────────────────────────────────────────

#[test]
fn paged_file_under_split_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "subsetA/train/report_page007.md", "# Page seven");

    let records = collect(&dir.path().join("subsetA")).unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.source_file, "report");
    assert_eq!(r.page_number, Some(7));
    assert_eq!(r.split, "train");
    assert_eq!(r.id, "train/report_page007.md");
}

#[test]
fn root_level_file_defaults_to_train() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "subsetA/summary.md", "summary");

    let records = collect(&dir.path().join("subsetA")).unwrap();
    assert_eq!(records[0].split, "train");
    assert_eq!(records[0].page_number, None);
    assert_eq!(records[0].source_file, "summary");
}

// ── Single-file export ───────────────────────────────────────────────────────

#[test]
fn schema_and_values_read_back() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "laws/train/act_page001.md", "Sección 1");
    write(dir.path(), "laws/train/act_page002.md", "Section 2");
    write(dir.path(), "laws/train/notice.md", "notice");

    let path = exporter(dir.path()).export_subset("laws", Some("train")).unwrap();
    assert_eq!(path, dir.path().join(DATASET_DIR).join("laws-train.parquet"));

    let batches = read_parquet(&path);
    let schema = batches[0].schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "source_file", "split", "page_number", "text", "text_length", "file_path"]
    );
    assert_eq!(schema.field_with_name("page_number").unwrap().data_type(), &DataType::Int32);
    assert!(schema.field_with_name("page_number").unwrap().is_nullable());
    assert_eq!(schema.field_with_name("text_length").unwrap().data_type(), &DataType::Int64);

    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 3);
    let pages = batch.column_by_name("page_number").unwrap().as_primitive::<Int32Type>();
    assert_eq!(pages.value(0), 1);
    assert_eq!(pages.value(1), 2);
    assert!(pages.is_null(2));

    let lengths = batch.column_by_name("text_length").unwrap().as_primitive::<Int64Type>();
    assert_eq!(lengths.value(0), "Sección 1".chars().count() as i64);

    let sources = batch.column_by_name("source_file").unwrap().as_string::<i32>();
    assert_eq!(sources.value(0), "act");
    assert_eq!(sources.value(2), "notice");
}

#[test]
fn zero_markdown_files_is_no_records() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "empty/readme.txt", "not markdown");
    std::fs::create_dir_all(dir.path().join("empty/train")).unwrap();

    let err = exporter(dir.path()).export_subset("empty", None).unwrap_err();
    assert!(matches!(err, OcrError::NoRecords { .. }));
    assert!(!dir.path().join(DATASET_DIR).join("empty.parquet").exists());
}

// ── Sharding ─────────────────────────────────────────────────────────────────

#[test]
fn large_split_is_sharded_in_record_order() {
    let dir = tempfile::tempdir().unwrap();
    let body = "x".repeat(200);
    for i in 0..10 {
        write(dir.path(), &format!("big/train/doc_page{:03}.md", i + 1), &body);
    }

    let records = collect(&dir.path().join("big")).unwrap();
    let bytes = estimate_bytes(&records);
    let max_mb = (bytes as f64 / (1024.0 * 1024.0)) / 3.5;
    let expected = match plan_shards(bytes, max_mb).unwrap() {
        ShardPlan::Sharded(n) => n,
        ShardPlan::Single => panic!("expected sharding"),
    };
    assert_eq!(expected, 4);

    let summary = exporter(dir.path()).export_all(max_mb).unwrap();
    assert!(summary.is_success());
    let files = &summary.files["big"];
    assert_eq!(files.len(), 4);
    for (i, f) in files.iter().enumerate() {
        let name = f.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, format!("big-train-{:05}-of-00004.parquet", i));
    }

    // 10 records over 4 shards: 2, 2, 2, 4 and nothing lost or reordered.
    let per_shard: Vec<Vec<String>> = files.iter().map(|f| ids(f)).collect();
    let sizes: Vec<usize> = per_shard.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 2, 2, 4]);
    let all: Vec<String> = per_shard.into_iter().flatten().collect();
    let expected_ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
    assert_eq!(all, expected_ids);
}

#[test]
fn boundary_size_stays_single_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "s/train/a.md", "hello");
    let records = collect(&dir.path().join("s")).unwrap();
    let exact_mb = estimate_bytes(&records) as f64 / (1024.0 * 1024.0);

    let summary = exporter(dir.path()).export_all(exact_mb).unwrap();
    let files: Vec<PathBuf> = summary.files["s"].clone();
    assert_eq!(files, vec![dir.path().join(DATASET_DIR).join("s-train.parquet")]);
}

// ── export_all ───────────────────────────────────────────────────────────────

#[test]
fn export_all_groups_by_split() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "hearings/train/a_page001.md", "a1");
    write(dir.path(), "hearings/test/b.md", "b");
    write(dir.path(), "hearings/validation/c.md", "c");
    write(dir.path(), "hearings/loose.md", "loose");

    let summary = exporter(dir.path()).export_all(500.0).unwrap();
    let names: Vec<String> = summary.files["hearings"]
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "hearings-test.parquet",
            "hearings-train.parquet",
            "hearings-validation.parquet"
        ]
    );
    // "loose.md" sits at the subset root, so it lands in train.
    let train = dir.path().join(DATASET_DIR).join("hearings-train.parquet");
    assert_eq!(ids(&train), vec!["loose.md", "train/a_page001.md"]);
}

#[test]
fn export_all_reports_failures_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "good/a.md", "ok");
    // Invalid UTF-8 makes the whole subset fail to collect.
    let bad = dir.path().join("bad");
    std::fs::create_dir_all(&bad).unwrap();
    std::fs::write(bad.join("broken.md"), [0xc3, 0x28]).unwrap();

    let summary = exporter(dir.path()).export_all(500.0).unwrap();

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].subset, "bad");
    assert_eq!(summary.failures[0].split, None);
    assert!(summary.files.contains_key("good"));
    assert!(!summary.files.contains_key("bad"));
}

#[test]
fn failing_split_does_not_stop_other_splits() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "s/train/a.md", "train text");
    write(dir.path(), "s/test/b.md", "test text");
    // A directory in the way makes the rename onto s-test.parquet fail.
    let blocker = dir.path().join(DATASET_DIR).join("s-test.parquet");
    std::fs::create_dir_all(blocker.join("occupied")).unwrap();

    let summary = exporter(dir.path()).export_all(500.0).unwrap();

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].subset, "s");
    assert_eq!(summary.failures[0].split.as_deref(), Some("test"));
    let train = dir.path().join(DATASET_DIR).join("s-train.parquet");
    assert_eq!(summary.files["s"], vec![train.clone()]);
    assert_eq!(ids(&train), vec!["train/a.md"]);
}

#[test]
fn dataset_card_is_written() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "hearings/train/a_page001.md", "a");
    let out = dir.path().join(DATASET_DIR).join("README.md");

    let card = exporter(dir.path()).create_dataset_card(Some(&out)).unwrap();
    assert!(card.contains("# ocr-dataset"));
    assert!(card.contains("deepseek-ai/DeepSeek-OCR"));
    assert!(out.is_file());
}
