//! Configuration types for OCR batches and dataset export.
//!
//! OCR behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`]. Export behaviour lives in [`ExportConfig`]. Both can
//! be loaded together from a YAML file as a [`PipelineConfig`]; the CLI
//! applies its own flags on top, and the resulting value is what gets
//! snapshotted into a collection manifest.

use crate::error::OcrError;
use crate::prompts::DEFAULT_OCR_PROMPT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default base URL of the local vLLM OpenAI-compatible API.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000/v1";

/// Model name the vLLM server registers for DeepSeek-OCR.
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-OCR";

/// Configuration for talking to the OCR server and writing markdown.
///
/// Built via [`OcrConfig::builder()`] or using [`OcrConfig::default()`].
///
/// # Example
/// ```rust
/// use vlm_ocr::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .server_url("http://gpu-box:8000/v1")
///     .max_retries(5)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Base URL of the OpenAI-compatible API, including `/v1`.
    pub server_url: String,

    /// Model identifier sent in every chat-completions request.
    pub model: String,

    /// Instruction sent alongside every page image.
    pub prompt: String,

    /// Maximum tokens the model may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Attempts per page before giving up. Default: 3.
    pub max_retries: u32,

    /// Base retry delay in milliseconds. Default: 1000.
    ///
    /// Doubles after each failed attempt: 1 s → 2 s → 4 s.
    pub retry_backoff_ms: u64,

    /// Per-request timeout in seconds. Default: 300.
    ///
    /// Dense pages on a busy GPU routinely take over a minute.
    pub request_timeout_secs: u64,

    /// Timeout for the `/health` check in seconds. Default: 5.
    pub health_timeout_secs: u64,

    /// Rasterisation DPI for PDF pages. Range: 72–400. Default: 200.
    pub dpi: u32,

    /// DeepSeek-OCR resolution mode. Recorded in dataset metadata.
    pub resolution: Resolution,

    /// Overwrite markdown files that already exist. Default: false.
    pub overwrite: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_OCR_PROMPT.to_string(),
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 1000,
            request_timeout_secs: 300,
            health_timeout_secs: 5,
            dpi: 200,
            resolution: Resolution::default(),
            overwrite: false,
        }
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), OcrError> {
        if !(72..=400).contains(&self.dpi) {
            return Err(OcrError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                self.dpi
            )));
        }
        if self.max_retries == 0 {
            return Err(OcrError::InvalidConfig(
                "max_retries must be ≥ 1".into(),
            ));
        }
        if url::Url::parse(&self.server_url).is_err() {
            return Err(OcrError::InvalidConfig(format!(
                "server_url is not a valid URL: '{}'",
                self.server_url
            )));
        }
        Ok(())
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn health_timeout_secs(mut self, secs: u64) -> Self {
        self.config.health_timeout_secs = secs;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.config.resolution = resolution;
        self
    }

    pub fn overwrite(mut self, v: bool) -> Self {
        self.config.overwrite = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Settings for turning markdown outputs into a parquet dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Dataset name used in the dataset card.
    pub dataset_name: String,

    /// Upper bound per parquet shard in MB (estimated). Default: 500.
    pub max_shard_size_mb: f64,

    /// OCR model recorded in the dataset card.
    pub ocr_model: String,

    /// Resolution mode recorded in the dataset card.
    pub resolution: Resolution,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dataset_name: "ocr-dataset".to_string(),
            max_shard_size_mb: 500.0,
            ocr_model: DEFAULT_MODEL.to_string(),
            resolution: Resolution::default(),
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), OcrError> {
        if !(self.max_shard_size_mb > 0.0) {
            return Err(OcrError::InvalidConfig(format!(
                "max_shard_size_mb must be > 0, got {}",
                self.max_shard_size_mb
            )));
        }
        if self.dataset_name.trim().is_empty() {
            return Err(OcrError::InvalidConfig("dataset_name must not be empty".into()));
        }
        Ok(())
    }
}

/// Everything a pipeline run needs, as stored in a YAML file.
///
/// ```yaml
/// ocr:
///   server_url: http://127.0.0.1:8000/v1
///   max_retries: 5
/// export:
///   dataset_name: hearings-ocr
///   max_shard_size_mb: 250
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ocr: OcrConfig,
    pub export: ExportConfig,
}

impl PipelineConfig {
    /// Load and validate a YAML configuration file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, OcrError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| OcrError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: PipelineConfig =
            serde_yaml::from_str(&raw).map_err(|e| OcrError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        config.ocr.validate()?;
        config.export.validate()?;
        Ok(config)
    }

    /// Write this configuration as YAML (atomically).
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<(), OcrError> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| OcrError::Internal(format!("serialise config: {e}")))?;
        crate::fsutil::write_atomic(path, yaml.as_bytes())
    }

    /// Opaque JSON copy for a manifest's `config_snapshot`.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// DeepSeek-OCR resolution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Tiny,
    Small,
    #[default]
    Base,
    Large,
    Gundam,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Tiny => "tiny",
            Resolution::Small => "small",
            Resolution::Base => "base",
            Resolution::Large => "large",
            Resolution::Gundam => "gundam",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(Resolution::Tiny),
            "small" => Ok(Resolution::Small),
            "base" => Ok(Resolution::Base),
            "large" => Ok(Resolution::Large),
            "gundam" => Ok(Resolution::Gundam),
            other => Err(OcrError::InvalidConfig(format!(
                "unknown resolution '{other}' (expected tiny, small, base, large or gundam)"
            ))),
        }
    }
}
