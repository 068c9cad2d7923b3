//! The metadata record stored for each monetized content item.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One monetized content item.
///
/// Serialized with exactly six keys, in this order: `rootHash`, `txHash`,
/// `summary`, `wallet_address`, `amount`, `timestamp`. Existing index
/// documents use this flat shape, so the keys must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Content hash of the stored bytes. Unique within an index.
    #[serde(rename = "rootHash")]
    pub root_hash: String,

    /// Transaction that produced the upload.
    #[serde(rename = "txHash")]
    pub tx_hash: String,

    /// Human-readable synopsis; the only field searched.
    pub summary: String,

    /// Creator identity. Not validated.
    pub wallet_address: String,

    /// Price as a decimal literal, in token units.
    pub amount: String,

    /// ISO-8601 creation time, assigned by the writer.
    pub timestamp: String,
}

impl ContentRecord {
    /// Create a record with empty summary, zero amount and no timestamp.
    pub fn new(
        root_hash: impl Into<String>,
        tx_hash: impl Into<String>,
        wallet_address: impl Into<String>,
    ) -> Self {
        Self {
            root_hash: root_hash.into(),
            tx_hash: tx_hash.into(),
            summary: String::new(),
            wallet_address: wallet_address.into(),
            amount: "0".to_string(),
            timestamp: String::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = amount.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Set the timestamp to now, e.g. `2025-01-01T00:00:00.000Z`.
    pub fn stamped_now(self) -> Self {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.with_timestamp(now)
    }

    /// Case-insensitive substring match against the summary.
    pub fn summary_matches(&self, query: &str) -> bool {
        self.summary
            .to_lowercase()
            .contains(&query.to_lowercase())
    }
}
