//! OCR interaction: send a page image to the OpenAI-compatible server.
//!
//! The request is one user message holding a text part (the prompt) and an
//! `image_url` part (the page as a PNG data URI).
//!
//! ## Retry Strategy
//!
//! Every attempt that fails (transport error, non-2xx status, malformed
//! body or no `choices`) is retried up to `max_retries` attempts in total, with
//! exponential backoff `retry_backoff_ms * 2^attempt` between them: 1 s → 2 s
//! with the defaults.

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::pipeline::encode::{load_image, to_data_uri};
use image::DynamicImage;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// `http://host:8000/v1` → `http://host:8000/health`.
pub fn health_url(server_url: &str) -> String {
    let base = server_url.trim_end_matches('/');
    let base = base.strip_suffix("/v1").unwrap_or(base);
    format!("{base}/health")
}

/// Client for one OCR server.
#[derive(Debug, Clone)]
pub struct OcrClient {
    http: reqwest::Client,
    config: OcrConfig,
    completions_url: String,
    health_url: String,
}

impl OcrClient {
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| OcrError::Internal(format!("HTTP client: {e}")))?;
        let completions_url = format!(
            "{}/chat/completions",
            config.server_url.trim_end_matches('/')
        );
        let health_url = health_url(&config.server_url);
        Ok(Self {
            http,
            config,
            completions_url,
            health_url,
        })
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// `true` only when `/health` answers HTTP 200 within the health timeout.
    pub async fn health_check(&self) -> bool {
        let result = self
            .http
            .get(&self.health_url)
            .timeout(Duration::from_secs(self.config.health_timeout_secs))
            .send()
            .await;
        match result {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!("Health check against {} failed: {}", self.health_url, e);
                false
            }
        }
    }

    /// Fail with [`OcrError::ServerNotAvailable`] unless the server is healthy.
    pub async fn ensure_available(&self) -> Result<(), OcrError> {
        if self.health_check().await {
            Ok(())
        } else {
            Err(OcrError::ServerNotAvailable {
                url: self.health_url.clone(),
            })
        }
    }

    /// Extract markdown from an image file.
    pub async fn process_image_file(&self, path: &Path) -> Result<String, OcrError> {
        let image = load_image(path)?;
        self.process_image(&image).await
    }

    /// Extract markdown from one image.
    ///
    /// Checks server health first, then sends the request with retries.
    pub async fn process_image(&self, image: &DynamicImage) -> Result<String, OcrError> {
        self.ensure_available().await?;

        let data_uri = to_data_uri(image).map_err(|e| OcrError::InvalidImage {
            path: "<in-memory>".into(),
            detail: e.to_string(),
        })?;
        let body = json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": self.config.prompt },
                    { "type": "image_url", "image_url": { "url": data_uri } }
                ]
            }],
            "max_tokens": self.config.max_tokens,
        });

        let start = Instant::now();
        let attempts = self.config.max_retries.max(1);
        let mut last_err = String::new();

        for attempt in 0..attempts {
            match self.send_once(&body).await {
                Ok(text) => {
                    debug!(
                        "OCR response: {} chars in {:?} (attempt {})",
                        text.len(),
                        start.elapsed(),
                        attempt + 1
                    );
                    return Ok(text);
                }
                Err(e) => {
                    warn!("OCR attempt {}/{} failed: {}", attempt + 1, attempts, e);
                    last_err = e;
                }
            }
            if attempt + 1 < attempts {
                let backoff = self.config.retry_backoff_ms.saturating_mul(1u64 << attempt.min(20));
                sleep(Duration::from_millis(backoff)).await;
            }
        }

        Err(OcrError::ApiError {
            message: format!("request failed after {attempts} attempt(s): {last_err}"),
        })
    }

    async fn send_once(&self, body: &serde_json::Value) -> Result<String, String> {
        let resp = self
            .http
            .post(&self.completions_url)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {}", text.trim()));
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| e.to_string())?;
        // No choice at all is a failed attempt; a choice with null content is
        // an empty page.
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| "no response content from API".to_string())?;
        Ok(choice.message.content.unwrap_or_default())
    }
}
