//! Launcher for the local vLLM OpenAI-compatible server that hosts the OCR
//! model. Runs `python -m vllm.entrypoints.openai.api_server` in the
//! foreground and inherits its stdio.

use crate::config::DEFAULT_MODEL;
use crate::error::OcrError;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::info;

/// Python module path of the vLLM OpenAI-compatible server.
const VLLM_ENTRYPOINT: &str = "vllm.entrypoints.openai.api_server";

/// Options for one vLLM server process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VllmServer {
    /// Python interpreter with vLLM installed.
    pub python: String,
    pub model: String,
    pub host: String,
    pub port: u16,
    /// Fraction of GPU memory vLLM may claim (0.0–1.0).
    pub gpu_memory_utilization: f32,
    pub tensor_parallel_size: u32,
    /// Context length cap; the model's own maximum when `None`.
    pub max_model_len: Option<u32>,
}

impl Default for VllmServer {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            model: DEFAULT_MODEL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            gpu_memory_utilization: 0.9,
            tensor_parallel_size: 1,
            max_model_len: None,
        }
    }
}

impl VllmServer {
    /// Base URL clients should use (`http://host:port/v1`).
    pub fn api_url(&self) -> String {
        format!("http://{}:{}/v1", self.host, self.port)
    }

    /// Command-line arguments passed to the interpreter.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            VLLM_ENTRYPOINT.to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--host".to_string(),
            self.host.clone(),
            "--port".to_string(),
            self.port.to_string(),
            "--gpu-memory-utilization".to_string(),
            self.gpu_memory_utilization.to_string(),
            "--tensor-parallel-size".to_string(),
            self.tensor_parallel_size.to_string(),
            "--trust-remote-code".to_string(),
        ];
        if let Some(len) = self.max_model_len {
            args.push("--max-model-len".to_string());
            args.push(len.to_string());
        }
        args
    }

    pub fn validate(&self) -> Result<(), OcrError> {
        if !(self.gpu_memory_utilization > 0.0 && self.gpu_memory_utilization <= 1.0) {
            return Err(OcrError::InvalidConfig(format!(
                "gpu_memory_utilization must be in (0, 1], got {}",
                self.gpu_memory_utilization
            )));
        }
        if self.tensor_parallel_size == 0 {
            return Err(OcrError::InvalidConfig(
                "tensor_parallel_size must be ≥ 1".into(),
            ));
        }
        Ok(())
    }

    /// Run the server until it exits.
    pub async fn run(&self) -> Result<(), OcrError> {
        self.validate()?;
        info!("Starting vLLM server for {}", self.model);
        info!("OpenAI-compatible endpoint: {}", self.api_url());
        info!(
            "Health check: http://{}:{}/health",
            self.host, self.port
        );

        let status = Command::new(&self.python)
            .args(self.args())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| OcrError::ServerLaunchFailed(format!("{}: {}", self.python, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(OcrError::ServerLaunchFailed(format!("exited with {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_args() {
        let args = VllmServer::default().args();
        assert_eq!(args[0..2], ["-m", VLLM_ENTRYPOINT]);
        assert!(args.windows(2).any(|w| w == ["--port", "8000"]));
        assert!(args.windows(2).any(|w| w == ["--gpu-memory-utilization", "0.9"]));
        assert!(args.contains(&"--trust-remote-code".to_string()));
        assert!(!args.contains(&"--max-model-len".to_string()));
    }

    #[test]
    fn max_model_len_is_appended() {
        let server = VllmServer {
            max_model_len: Some(8192),
            ..Default::default()
        };
        let args = server.args();
        assert_eq!(&args[args.len() - 2..], ["--max-model-len", "8192"]);
    }

    #[test]
    fn rejects_bad_gpu_fraction() {
        let server = VllmServer {
            gpu_memory_utilization: 1.5,
            ..Default::default()
        };
        assert!(server.validate().is_err());
    }

    #[test]
    fn api_url_uses_host_and_port() {
        let server = VllmServer {
            host: "0.0.0.0".into(),
            port: 9000,
            ..Default::default()
        };
        assert_eq!(server.api_url(), "http://0.0.0.0:9000/v1");
    }
}
