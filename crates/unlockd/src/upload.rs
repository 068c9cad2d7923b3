//! The monetize pipeline: store the bytes, summarize them, index the result.
//!
//! The three steps are not transactional. Content that reached storage stays
//! there even if indexing fails, and a failed summary only degrades the record.

use std::sync::Arc;

use contentindex::{ContentRecord, MetadataIndex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::storage::{GatewayError, StorageGateway};
use crate::summarize::Summarizer;

/// Stored in the record when the summarizer fails.
pub const NO_SUMMARY: &str = "No summary available";
/// Returned to the uploader when the summarizer fails.
pub const SUMMARY_FAILED: &str = "Summary generation failed";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message: String,
    #[serde(rename = "txHash")]
    pub tx_hash: String,
    #[serde(rename = "rootHash")]
    pub root_hash: String,
    #[serde(rename = "aiSummary")]
    pub ai_summary: String,
    pub wallet_address: String,
    pub amount: String,
    pub timestamp: String,
    /// False when the record was not added (duplicate or index failure).
    pub indexed: bool,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Content is required.")]
    MissingContent,

    #[error("Wallet address is required.")]
    MissingWallet,

    #[error("Failed to upload content to storage.")]
    Storage(#[source] GatewayError),
}

pub struct UploadPipeline {
    index: Arc<dyn MetadataIndex>,
    storage: Arc<dyn StorageGateway>,
    summarizer: Arc<dyn Summarizer>,
}

impl UploadPipeline {
    pub fn new(
        index: Arc<dyn MetadataIndex>,
        storage: Arc<dyn StorageGateway>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            index,
            storage,
            summarizer,
        }
    }

    #[tracing::instrument(name = "upload.submit", skip(self, request))]
    pub async fn submit(&self, request: SendRequest) -> Result<SendReceipt, UploadError> {
        let content = request
            .content
            .filter(|c| !c.is_empty())
            .ok_or(UploadError::MissingContent)?;
        let wallet_address = request
            .wallet_address
            .filter(|w| !w.is_empty())
            .ok_or(UploadError::MissingWallet)?;
        let amount = request
            .amount
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "0".to_string());

        info!(%wallet_address, %amount, bytes = content.len(), "uploading content to storage");
        let receipt = self
            .storage
            .upload(content.clone().into_bytes())
            .await
            .map_err(|e| {
                warn!(error = %e, "storage upload failed");
                UploadError::Storage(e)
            })?;

        let summary = match self.summarizer.summarize(&content).await {
            Ok(summary) if !summary.is_empty() => Some(summary),
            Ok(_) => {
                warn!(root_hash = %receipt.root_hash, "summarizer returned an empty summary");
                None
            }
            Err(e) => {
                warn!(root_hash = %receipt.root_hash, error = %e, "summary generation failed");
                None
            }
        };

        let record = ContentRecord::new(&receipt.root_hash, &receipt.tx_hash, &wallet_address)
            .with_summary(summary.as_deref().unwrap_or(NO_SUMMARY))
            .with_amount(&amount)
            .stamped_now();
        let timestamp = record.timestamp.clone();

        let index = Arc::clone(&self.index);
        let indexed = match tokio::task::spawn_blocking(move || index.append(record)).await {
            Ok(indexed) => indexed,
            Err(e) => {
                warn!(error = %e, "index append task failed");
                false
            }
        };
        if indexed {
            info!(root_hash = %receipt.root_hash, "content metadata saved");
        } else {
            warn!(root_hash = %receipt.root_hash, "content metadata not saved (may already exist)");
        }

        Ok(SendReceipt {
            message: "Content monetized successfully!".to_string(),
            tx_hash: receipt.tx_hash,
            root_hash: receipt.root_hash,
            ai_summary: summary.unwrap_or_else(|| SUMMARY_FAILED.to_string()),
            wallet_address,
            amount,
            timestamp,
            indexed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UploadReceipt;
    use async_trait::async_trait;
    use contentindex::MemoryIndex;
    use std::sync::Mutex;

    struct FakeStorage {
        root_hash: String,
        uploads: Mutex<Vec<Vec<u8>>>,
        fail: bool,
    }

    impl FakeStorage {
        fn new(root_hash: &str) -> Self {
            Self {
                root_hash: root_hash.to_string(),
                uploads: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new("unused")
            }
        }
    }

    #[async_trait]
    impl StorageGateway for FakeStorage {
        async fn upload(&self, bytes: Vec<u8>) -> Result<UploadReceipt, GatewayError> {
            if self.fail {
                return Err(GatewayError::Disabled("storage relay"));
            }
            self.uploads.lock().unwrap().push(bytes);
            Ok(UploadReceipt {
                root_hash: self.root_hash.clone(),
                tx_hash: format!("tx-{}", self.root_hash),
            })
        }

        async fn download(&self, _root_hash: &str) -> Result<Vec<u8>, GatewayError> {
            Err(GatewayError::Disabled("storage relay"))
        }
    }

    struct FixedSummary(Option<&'static str>);

    #[async_trait]
    impl Summarizer for FixedSummary {
        async fn summarize(&self, _content: &str) -> Result<String, GatewayError> {
            self.0
                .map(str::to_string)
                .ok_or(GatewayError::Disabled("summarizer"))
        }
    }

    fn pipeline(
        index: Arc<MemoryIndex>,
        storage: FakeStorage,
        summary: Option<&'static str>,
    ) -> UploadPipeline {
        UploadPipeline::new(index, Arc::new(storage), Arc::new(FixedSummary(summary)))
    }

    fn request(content: &str, wallet: &str, amount: Option<&str>) -> SendRequest {
        SendRequest {
            content: Some(content.to_string()),
            wallet_address: Some(wallet.to_string()),
            amount: amount.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_submit_indexes_record() {
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline(index.clone(), FakeStorage::new("0xR1"), Some("About bitcoin."));

        let receipt = pipeline
            .submit(request("bitcoin article", "0xW", Some("0.3")))
            .await
            .unwrap();

        assert_eq!(receipt.message, "Content monetized successfully!");
        assert_eq!(receipt.root_hash, "0xR1");
        assert_eq!(receipt.tx_hash, "tx-0xR1");
        assert_eq!(receipt.ai_summary, "About bitcoin.");
        assert_eq!(receipt.amount, "0.3");
        assert!(receipt.indexed);

        let stored = index.lookup("0xR1").unwrap();
        assert_eq!(stored.summary, "About bitcoin.");
        assert_eq!(stored.wallet_address, "0xW");
        assert_eq!(stored.timestamp, receipt.timestamp);
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected_before_upload() {
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline(index.clone(), FakeStorage::new("0xR1"), Some("s"));

        let err = pipeline.submit(request("", "0xW", None)).await.unwrap_err();
        assert!(matches!(err, UploadError::MissingContent));
        assert_eq!(err.to_string(), "Content is required.");

        let err = pipeline
            .submit(SendRequest {
                content: Some("text".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Wallet address is required.");

        assert!(index.read_all().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_indexes_nothing() {
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline(index.clone(), FakeStorage::failing(), Some("s"));

        let err = pipeline.submit(request("text", "0xW", None)).await.unwrap_err();
        assert!(matches!(err, UploadError::Storage(_)));
        assert_eq!(err.to_string(), "Failed to upload content to storage.");
        assert!(index.read_all().is_empty());
    }

    #[tokio::test]
    async fn test_summary_failure_falls_back() {
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline(index.clone(), FakeStorage::new("0xR2"), None);

        let receipt = pipeline.submit(request("text", "0xW", None)).await.unwrap();
        assert_eq!(receipt.ai_summary, SUMMARY_FAILED);
        assert_eq!(receipt.amount, "0");
        assert_eq!(index.lookup("0xR2").unwrap().summary, NO_SUMMARY);
        assert_eq!(index.lookup("0xR2").unwrap().amount, "0");
    }

    #[tokio::test]
    async fn test_empty_summary_counts_as_failure() {
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline(index.clone(), FakeStorage::new("0xR3"), Some(""));

        let receipt = pipeline.submit(request("text", "0xW", None)).await.unwrap();
        assert_eq!(receipt.ai_summary, SUMMARY_FAILED);
        assert_eq!(index.lookup("0xR3").unwrap().summary, NO_SUMMARY);
    }

    #[tokio::test]
    async fn test_summary_is_stored_as_returned() {
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline(index.clone(), FakeStorage::new("0xR4"), Some("  padded\n"));

        let receipt = pipeline.submit(request("text", "0xW", None)).await.unwrap();
        assert_eq!(receipt.ai_summary, "  padded\n");
        assert_eq!(index.lookup("0xR4").unwrap().summary, "  padded\n");
    }

    #[tokio::test]
    async fn test_duplicate_root_still_succeeds() {
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline(index.clone(), FakeStorage::new("0xSAME"), Some("first"));

        let first = pipeline.submit(request("text", "0xW1", None)).await.unwrap();
        let second = pipeline.submit(request("text", "0xW2", None)).await.unwrap();

        assert!(first.indexed);
        assert!(!second.indexed);
        assert_eq!(second.message, "Content monetized successfully!");
        assert_eq!(index.read_all().len(), 1);
        assert_eq!(index.lookup("0xSAME").unwrap().wallet_address, "0xW1");
    }
}
