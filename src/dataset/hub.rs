//! Dataset rows straight from the Hugging Face Hub.
//!
//! The Hub publishes every dataset as parquet under the
//! `refs/convert/parquet` revision, one directory per subset and split.
//! Files are downloaded into the hf-hub cache (`HF_HOME`, token from
//! `huggingface-cli login`) one at a time as the driver reaches them.

use crate::dataset::source::{select_split_files, RowSource};
use crate::error::OcrError;
use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;
use tracing::info;

/// Revision holding the Hub's parquet conversion of a dataset.
pub const PARQUET_REVISION: &str = "refs/convert/parquet";

pub struct HubDataset {
    dataset: String,
    repo: ApiRepo,
}

impl HubDataset {
    pub fn new(dataset: impl Into<String>) -> Result<Self, OcrError> {
        let dataset = dataset.into();
        let api = Api::new().map_err(|e| OcrError::DatasetFetchFailed {
            dataset: dataset.clone(),
            detail: e.to_string(),
        })?;
        let repo = api.repo(Repo::with_revision(
            dataset.clone(),
            RepoType::Dataset,
            PARQUET_REVISION.to_string(),
        ));
        Ok(Self { dataset, repo })
    }

    fn fetch_err(&self, e: impl std::fmt::Display) -> OcrError {
        OcrError::DatasetFetchFailed {
            dataset: self.dataset.clone(),
            detail: e.to_string(),
        }
    }
}

impl RowSource for HubDataset {
    fn list(&self, subset: &str, split: &str) -> Result<Vec<String>, OcrError> {
        let info = self.repo.info().map_err(|e| self.fetch_err(e))?;
        let files = select_split_files(
            info.siblings.iter().map(|s| s.rfilename.as_str()),
            subset,
            split,
        );
        if files.is_empty() {
            return Err(OcrError::SplitNotFound {
                subset: subset.to_string(),
                split: split.to_string(),
            });
        }
        Ok(files)
    }

    fn fetch(&self, name: &str) -> Result<PathBuf, OcrError> {
        info!("Downloading {}:{}", self.dataset, name);
        self.repo.get(name).map_err(|e| self.fetch_err(e))
    }
}
