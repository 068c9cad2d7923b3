//! Client for the decentralized storage relay.
//!
//! The relay owns Merkle tree construction and transaction signing. We only
//! hand it bytes and get back the `rootHash` / `txHash` pair, or ask it for
//! the bytes behind a `rootHash`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unlockconf::StorageConfig;

/// Errors from the storage relay or the summarizer endpoint.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid response from {service}: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("{0} is not configured")]
    Disabled(&'static str),
}

/// Identifiers the relay hands back for stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub root_hash: String,
    pub tx_hash: String,
}

#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Store `bytes` and return their content address and transaction.
    async fn upload(&self, bytes: Vec<u8>) -> Result<UploadReceipt, GatewayError>;

    /// Fetch the bytes stored under `root_hash`.
    async fn download(&self, root_hash: &str) -> Result<Vec<u8>, GatewayError>;
}

/// Storage relay spoken to over plain HTTP.
pub struct HttpStorageGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStorageGateway {
    pub fn new(config: &StorageConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            base_url: config.indexer_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl StorageGateway for HttpStorageGateway {
    #[tracing::instrument(name = "storage.upload", skip(self, bytes), fields(bytes = bytes.len()))]
    async fn upload(&self, bytes: Vec<u8>) -> Result<UploadReceipt, GatewayError> {
        let url = format!("{}/upload", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                service: "storage relay",
                status: status.as_u16(),
                body,
            });
        }

        let receipt: UploadReceipt =
            response
                .json()
                .await
                .map_err(|e| GatewayError::InvalidResponse {
                    service: "storage relay",
                    message: e.to_string(),
                })?;

        if receipt.root_hash.is_empty() {
            return Err(GatewayError::InvalidResponse {
                service: "storage relay",
                message: "empty rootHash".to_string(),
            });
        }

        tracing::debug!(root_hash = %receipt.root_hash, tx_hash = %receipt.tx_hash, "upload stored");
        Ok(receipt)
    }

    #[tracing::instrument(name = "storage.download", skip(self))]
    async fn download(&self, root_hash: &str) -> Result<Vec<u8>, GatewayError> {
        let url = format!("{}/file", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("root", root_hash)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                service: "storage relay",
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
