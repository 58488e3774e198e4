//! Markdown tree → HuggingFace-style parquet dataset.
//!
//! ```text
//! <output_dir>/<subset>/<split>/<doc>_page001.md ─┐
//!                                                 ├─ collect ─ group by split ─ plan_shards ─ export
//! <output_dir>/<subset>/<doc>.md ─────────────────┘                                             │
//!                                                  <output_dir>/dataset/<subset>-<split>[-i-of-n].parquet
//! ```
//!
//! The markdown tree is either produced by [`crate::process_batch`] or, for
//! an existing HuggingFace dataset, by [`process_dataset`] over its parquet
//! rows.

pub mod card;
pub mod export;
#[cfg(feature = "hub")]
pub mod hub;
pub mod process;
pub mod record;
pub mod shard;
pub mod source;

pub use export::{export, export_schema, DatasetExporter, ExportSummary, DATASET_DIR};
#[cfg(feature = "hub")]
pub use hub::HubDataset;
pub use process::{process_dataset, DatasetReport, SubsetStats};
pub use record::{collect, ExportRecord};
pub use shard::{plan_shards, ShardPlan};
pub use source::{DatasetConfig, LocalParquet, RowSource, SubsetConfig};
