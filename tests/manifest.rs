//! Integration tests for the collection manifest store.
//!
//! Every test works in its own temp directory; nothing touches the network.

use std::path::Path;
use vlm_ocr::{
    CollectionManifest, ManifestStore, OcrError, ProceedingMetadata, ProcessingStatus,
    ResourceRecord, ResourceType, SourceType, StatusUpdate,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn metadata() -> ProceedingMetadata {
    let mut m = ProceedingMetadata::new(
        "https://www.congress.gov/event/118th-congress/house-event/115000",
        "hrg-115000",
        "Oversight of Federal Records",
    )
    .unwrap();
    m.committee = Some("Oversight and Accountability".into());
    m.witnesses = vec!["A. Archivist".into()];
    m
}

fn record(url: &str, rt: ResourceType) -> ResourceRecord {
    ResourceRecord::new(url, rt, SourceType::GovinfoApi, "file", 1).unwrap()
}

fn fresh(dir: &Path) -> (ManifestStore, CollectionManifest) {
    let store = ManifestStore::new(dir);
    let m = store
        .create(metadata(), serde_json::json!({"ocr": {"dpi": 200}}))
        .unwrap();
    (store, m)
}

// ── Properties ───────────────────────────────────────────────────────────────

#[test]
fn total_resources_counts_distinct_urls() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut m) = fresh(dir.path());

    let urls = [
        "https://example.com/a.pdf",
        "https://example.com/b.pdf",
        "https://example.com/a.pdf",
        "https://example.com/c.mp4",
        "https://example.com/b.pdf",
    ];
    for u in urls {
        store.add_resource(&mut m, record(u, ResourceType::Pdf)).unwrap();
    }

    assert_eq!(m.total_resources, 3);
    assert_eq!(store.load().unwrap().total_resources, 3);
}

#[test]
fn add_resource_replaces_existing_record() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut m) = fresh(dir.path());
    let url = "https://example.com/a.pdf";

    store.add_resource(&mut m, record(url, ResourceType::Pdf)).unwrap();
    store
        .update_status(&mut m, url, StatusUpdate::download(ProcessingStatus::Downloaded))
        .unwrap();
    store.add_resource(&mut m, record(url, ResourceType::Html)).unwrap();

    let r = m.get(url).unwrap();
    assert_eq!(r.resource_type, ResourceType::Html);
    assert_eq!(r.download_status, ProcessingStatus::Pending);
    assert_eq!(m.downloaded, 0);
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut m) = fresh(dir.path());
    store
        .add_resource(&mut m, record("https://example.com/a.pdf", ResourceType::Pdf))
        .unwrap();
    store
        .add_resource(&mut m, record("https://example.com/v.mp4", ResourceType::Video))
        .unwrap();
    let before = m.last_updated;

    store.save(&mut m).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded.resources, m.resources);
    assert_eq!(loaded.metadata, m.metadata);
    assert_eq!(loaded.config_snapshot, m.config_snapshot);
    assert!(loaded.last_updated >= before);
}

#[test]
fn manifest_json_is_keyed_by_url() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut m) = fresh(dir.path());
    store
        .add_resource(&mut m, record("https://example.com/a.pdf", ResourceType::Pdf))
        .unwrap();

    let raw = std::fs::read_to_string(store.manifest_path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &json["resources"]["https://example.com/a.pdf"];
    assert_eq!(entry["resource_type"], "pdf");
    assert_eq!(entry["source_type"], "govinfo_api");
    assert_eq!(entry["download_status"], "pending");
    assert!(json["started_at"].as_str().unwrap().contains('T'));
}

#[test]
fn mark_completed_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut m) = fresh(dir.path());
    store
        .add_resource(&mut m, record("https://example.com/a.pdf", ResourceType::Pdf))
        .unwrap();

    store.mark_completed(&mut m).unwrap();
    let first = m.completed_at.unwrap();
    let counts = m.statistics();

    store.mark_completed(&mut m).unwrap();
    assert!(m.completed_at.unwrap() >= first);
    assert_eq!(m.statistics(), counts);
}

#[test]
fn unknown_url_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut m) = fresh(dir.path());
    store
        .add_resource(&mut m, record("https://example.com/a.pdf", ResourceType::Pdf))
        .unwrap();
    let on_disk = std::fs::read(store.manifest_path()).unwrap();
    let in_memory = m.clone();

    let err = store
        .update_status(
            &mut m,
            "https://example.com/missing.pdf",
            StatusUpdate::download(ProcessingStatus::Failed),
        )
        .unwrap_err();

    assert!(matches!(err, OcrError::ResourceNotFound { .. }));
    assert_eq!(std::fs::read(store.manifest_path()).unwrap(), on_disk);
    assert_eq!(m, in_memory);
}

#[test]
fn failed_counts_resources_not_events() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut m) = fresh(dir.path());
    let url = "https://example.com/v.mp4";
    store.add_resource(&mut m, record(url, ResourceType::Video)).unwrap();

    let update = StatusUpdate {
        ocr: Some(ProcessingStatus::Failed),
        transcription: Some(ProcessingStatus::Failed),
        ..Default::default()
    };
    store.update_status(&mut m, url, update).unwrap();

    assert_eq!(m.failed, 1);
}

#[test]
fn statistics_pending_can_go_negative() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut m) = fresh(dir.path());
    let url = "https://example.com/a.pdf";
    store.add_resource(&mut m, record(url, ResourceType::Pdf)).unwrap();

    let update = StatusUpdate {
        download: Some(ProcessingStatus::Downloaded),
        ocr: Some(ProcessingStatus::Failed),
        ..Default::default()
    };
    store.update_status(&mut m, url, update).unwrap();

    let stats = m.statistics();
    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, -1);
}

#[test]
fn pending_and_downloaded_filter_by_type() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut m) = fresh(dir.path());
    store
        .add_resource(&mut m, record("https://example.com/a.pdf", ResourceType::Pdf))
        .unwrap();
    store
        .add_resource(&mut m, record("https://example.com/b.pdf", ResourceType::Pdf))
        .unwrap();
    store
        .add_resource(&mut m, record("https://example.com/v.mp4", ResourceType::Video))
        .unwrap();
    store
        .update_status(
            &mut m,
            "https://example.com/b.pdf",
            StatusUpdate::download(ProcessingStatus::Downloaded),
        )
        .unwrap();

    assert_eq!(m.pending(None).len(), 2);
    assert_eq!(m.pending(Some(ResourceType::Pdf)).len(), 1);
    assert_eq!(m.pending(Some(ResourceType::Audio)).len(), 0);
    assert_eq!(m.downloaded(Some(ResourceType::Pdf)).len(), 1);
    assert_eq!(m.downloaded(Some(ResourceType::Video)).len(), 0);
}

#[test]
fn load_missing_empty_and_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let store = ManifestStore::new(dir.path());

    assert!(matches!(store.load(), Err(OcrError::ManifestNotFound { .. })));

    std::fs::write(store.manifest_path(), "").unwrap();
    assert!(matches!(store.load(), Err(OcrError::ManifestNotFound { .. })));

    std::fs::write(store.manifest_path(), r#"{"metadata": 42}"#).unwrap();
    assert!(matches!(store.load(), Err(OcrError::ManifestParse { .. })));
}

#[test]
fn non_http_urls_are_rejected() {
    for bad in ["ftp://example.com/a.pdf", "not a url", "file:///tmp/a.pdf"] {
        let err = ResourceRecord::new(bad, ResourceType::Pdf, SourceType::Youtube, "a", 0)
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidUrl { .. }), "{bad}");
    }
}
