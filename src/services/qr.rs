use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LabelConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Error)]
pub enum QrError {
    #[error("QR service request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("QR service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("QR service response did not contain a qr_code")]
    MalformedResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct QrCodeRequest {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub id: String,
    pub pack_list_id: String,
    pub url: String,
    pub name: String,
}

impl QrCodeRequest {
    pub fn container(id: String, pack_list_id: String, url: String, name: String) -> Self {
        QrCodeRequest {
            record_type: "container",
            id,
            pack_list_id,
            url,
            name,
        }
    }
}

#[async_trait]
pub trait QrCodeGenerator: Send + Sync {
    async fn generate(&self, request: &QrCodeRequest) -> Result<String, QrError>;
}

#[derive(Debug, Deserialize)]
struct QrCodeResponse {
    qr_code: String,
}

/// QR generation backed by the external QR rendering service.
pub struct HttpQrService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpQrService {
    pub fn new(config: &LabelConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.qr_timeout_secs))
            .build()
            .map_err(|err| {
                AppError::ConfigError(config::ConfigError::Message(format!(
                    "Failed to build QR service client: {}",
                    err
                )))
            })?;
        Ok(HttpQrService {
            client,
            endpoint: config.qr_service_url.clone(),
        })
    }
}

#[async_trait]
impl QrCodeGenerator for HttpQrService {
    async fn generate(&self, request: &QrCodeRequest) -> Result<String, QrError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        if !response.status().is_success() {
            return Err(QrError::Status(response.status()));
        }
        let body: QrCodeResponse = response.json().await?;
        if body.qr_code.is_empty() {
            return Err(QrError::MalformedResponse);
        }
        Ok(body.qr_code)
    }
}
