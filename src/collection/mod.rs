//! Resumable collection runs.
//!
//! * [`resource`] — typed records for discovered artifacts and their
//!   per-stage [`ProcessingStatus`](resource::ProcessingStatus).
//! * [`manifest`] — [`ManifestStore`], the durable `manifest.json` that lets a
//!   long, failure-prone collection run pick up where it stopped.

pub mod manifest;
pub mod resource;

pub use manifest::{ManifestStore, StatusUpdate, MANIFEST_FILE_NAME};
pub use resource::{
    CollectionManifest, ManifestStatistics, ProceedingMetadata, ProcessingStatus, ResourceRecord,
    ResourceType, SourceType,
};
