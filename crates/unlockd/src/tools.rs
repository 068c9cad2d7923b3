//! Content tools for a conversational agent.
//!
//! Each tool takes JSON arguments and answers with plain text meant to be
//! read by an LLM. Tool failures are folded into that text; only an unknown
//! tool name or arguments that don't match the schema are errors.

use std::sync::Arc;

use contentindex::{ContentRecord, MetadataIndex};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::storage::StorageGateway;

/// Tool listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Parameters for search_content tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchContentParams {
    /// Search query or topic to find content (e.g., 'bitcoin', 'x402 protocol', 'blockchain payments')
    pub query: String,
}

/// Parameters for get_content_by_roothash tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetContentParams {
    /// The rootHash of the content to download from storage
    #[serde(rename = "rootHash")]
    pub root_hash: String,
}

/// Parameters for get_content_stats tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ContentStatsParams {}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
}

pub const SEARCH_CONTENT: &str = "search_content";
pub const GET_CONTENT_BY_ROOTHASH: &str = "get_content_by_roothash";
pub const GET_CONTENT_STATS: &str = "get_content_stats";

fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|e| {
        tracing::error!("Failed to serialize tool schema: {}", e);
        serde_json::json!({"type": "object"})
    })
}

/// Every tool with its description and input schema.
pub fn list_tools() -> Vec<ToolInfo> {
    vec![
        ToolInfo {
            name: SEARCH_CONTENT.to_string(),
            description: "Search for monetized content by topic or keywords. Returns content \
                metadata including rootHash, txHash, summary, and payment details. Use this to \
                find content that users have uploaded and monetized."
                .to_string(),
            input_schema: schema_of::<SearchContentParams>(),
        },
        ToolInfo {
            name: GET_CONTENT_BY_ROOTHASH.to_string(),
            description: "Download and retrieve the full content from storage using a rootHash. \
                Use this after finding content with search_content to get the actual blog post \
                or article content."
                .to_string(),
            input_schema: schema_of::<GetContentParams>(),
        },
        ToolInfo {
            name: GET_CONTENT_STATS.to_string(),
            description: "Get statistics about all monetized content including total content \
                count, total earnings, and unique creators. Use this to show overall platform \
                metrics."
                .to_string(),
            input_schema: schema_of::<ContentStatsParams>(),
        },
    ]
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, args: Value) -> Result<T, ToolError> {
    // Tools without parameters are often called with no body at all
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// The content tools bound to an index and a storage gateway.
#[derive(Clone)]
pub struct ContentTools {
    index: Arc<dyn MetadataIndex>,
    storage: Arc<dyn StorageGateway>,
}

impl ContentTools {
    pub fn new(index: Arc<dyn MetadataIndex>, storage: Arc<dyn StorageGateway>) -> Self {
        Self { index, storage }
    }

    /// Dispatch a tool call by name.
    #[tracing::instrument(name = "tools.call", skip(self, args))]
    pub async fn call(&self, name: &str, args: Value) -> Result<String, ToolError> {
        match name {
            SEARCH_CONTENT => {
                let params: SearchContentParams = parse_args(name, args)?;
                Ok(self.search_content(&params.query).await)
            }
            GET_CONTENT_BY_ROOTHASH => {
                let params: GetContentParams = parse_args(name, args)?;
                Ok(self.get_content_by_roothash(&params.root_hash).await)
            }
            GET_CONTENT_STATS => {
                let _params: ContentStatsParams = parse_args(name, args)?;
                Ok(self.get_content_stats().await)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    pub async fn search_content(&self, query: &str) -> String {
        let needle = query.to_string();
        let results = read_blocking(&self.index, move |index| index.search(&needle)).await;

        if results.is_empty() {
            return format!(
                "No content found for query: \"{query}\". Try different keywords or broader search terms."
            );
        }

        let listing = results
            .iter()
            .enumerate()
            .map(|(i, r)| format_search_hit(i + 1, r))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "Found {} content item(s) matching \"{query}\":\n\n{listing}",
            results.len()
        )
    }

    pub async fn get_content_by_roothash(&self, root_hash: &str) -> String {
        let key = root_hash.to_string();
        let Some(record) = read_blocking(&self.index, move |index| index.lookup(&key)).await else {
            return format!(
                "No content found with rootHash: {root_hash}. Make sure you're using the correct rootHash from search results."
            );
        };

        let content = match self.storage.download(root_hash).await {
            Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(_) => return download_failed(root_hash),
            Err(e) => {
                tracing::warn!(%root_hash, error = %e, "tool download failed");
                return download_failed(root_hash);
            }
        };

        format!(
            "Content retrieved successfully!\n\nMetadata:\n- RootHash: {}\n- TxHash: {}\n- Summary: {}\n- Creator: {}\n- Amount: {} tokens\n- Timestamp: {}\n\nFull Content:\n{}",
            record.root_hash,
            record.tx_hash,
            record.summary,
            record.wallet_address,
            record.amount,
            record.timestamp,
            content
        )
    }

    pub async fn get_content_stats(&self) -> String {
        let stats = read_blocking(&self.index, |index| index.statistics()).await;
        format!(
            "Content Statistics:\n- Total Content: {} items\n- Total Earnings: {:.4} tokens\n- Unique Creators: {} wallets",
            stats.total_content, stats.total_earnings, stats.unique_wallets
        )
    }
}

/// Run an index read on the blocking pool.
///
/// Index reads hit the filesystem. A read task that panics yields the same
/// neutral value the fail-soft index methods return.
pub(crate) async fn read_blocking<I, T, F>(index: &Arc<I>, read: F) -> T
where
    I: ?Sized + Send + Sync + 'static,
    T: Default + Send + 'static,
    F: FnOnce(&I) -> T + Send + 'static,
{
    let index = Arc::clone(index);
    match tokio::task::spawn_blocking(move || read(&*index)).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "index read task failed");
            T::default()
        }
    }
}

fn format_search_hit(n: usize, r: &ContentRecord) -> String {
    format!(
        "{n}. Summary: {}\n   RootHash: {}\n   TxHash: {}\n   Creator: {}\n   Amount: {} tokens\n   Timestamp: {}",
        r.summary, r.root_hash, r.tx_hash, r.wallet_address, r.amount, r.timestamp
    )
}

fn download_failed(root_hash: &str) -> String {
    format!(
        "Failed to download content from storage for rootHash: {root_hash}. The content may be unavailable or the storage network may be down."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{GatewayError, UploadReceipt};
    use async_trait::async_trait;
    use contentindex::MemoryIndex;
    use std::collections::HashMap;

    struct MapStorage(HashMap<String, Vec<u8>>);

    #[async_trait]
    impl StorageGateway for MapStorage {
        async fn upload(&self, _bytes: Vec<u8>) -> Result<UploadReceipt, GatewayError> {
            Err(GatewayError::Disabled("storage relay"))
        }

        async fn download(&self, root_hash: &str) -> Result<Vec<u8>, GatewayError> {
            self.0.get(root_hash).cloned().ok_or(GatewayError::Status {
                service: "storage relay",
                status: 404,
                body: String::new(),
            })
        }
    }

    fn record(root: &str, wallet: &str, amount: &str, summary: &str) -> ContentRecord {
        ContentRecord::new(root, format!("tx-{root}"), wallet)
            .with_summary(summary)
            .with_amount(amount)
            .with_timestamp("2025-01-01T00:00:00.000Z")
    }

    fn tools() -> ContentTools {
        let index = MemoryIndex::from_records(vec![
            record("0xA", "0xW1", "0.3", "Bitcoin payments explained"),
            record("0xB", "0xW2", "0.7", "Rollup economics"),
        ]);
        let storage = MapStorage(HashMap::from([(
            "0xA".to_string(),
            b"The full bitcoin article.".to_vec(),
        )]));
        ContentTools::new(Arc::new(index), Arc::new(storage))
    }

    #[test]
    fn test_list_tools_has_schemas() {
        let tools = list_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![SEARCH_CONTENT, GET_CONTENT_BY_ROOTHASH, GET_CONTENT_STATS]
        );

        let search = &tools[0].input_schema;
        assert!(search["properties"]["query"].is_object());
        let get = &tools[1].input_schema;
        assert!(get["properties"]["rootHash"].is_object());
    }

    #[tokio::test]
    async fn test_search_content_text() {
        let text = tools().search_content("bitcoin").await;
        assert_eq!(
            text,
            "Found 1 content item(s) matching \"bitcoin\":\n\n\
             1. Summary: Bitcoin payments explained\n   RootHash: 0xA\n   TxHash: tx-0xA\n   \
             Creator: 0xW1\n   Amount: 0.3 tokens\n   Timestamp: 2025-01-01T00:00:00.000Z"
        );
    }

    #[tokio::test]
    async fn test_search_content_no_hits() {
        let text = tools().search_content("ethereum").await;
        assert_eq!(
            text,
            "No content found for query: \"ethereum\". Try different keywords or broader search terms."
        );
    }

    #[tokio::test]
    async fn test_stats_text() {
        let text = tools().get_content_stats().await;
        assert_eq!(
            text,
            "Content Statistics:\n- Total Content: 2 items\n- Total Earnings: 1.0000 tokens\n- Unique Creators: 2 wallets"
        );
    }

    #[tokio::test]
    async fn test_stats_text_empty_index() {
        let empty = ContentTools::new(
            Arc::new(MemoryIndex::new()),
            Arc::new(MapStorage(HashMap::new())),
        );
        assert_eq!(
            empty.get_content_stats().await,
            "Content Statistics:\n- Total Content: 0 items\n- Total Earnings: 0.0000 tokens\n- Unique Creators: 0 wallets"
        );
    }

    #[tokio::test]
    async fn test_read_blocking_runs_off_the_runtime() {
        let index: Arc<dyn MetadataIndex> = Arc::new(MemoryIndex::new());

        let caller = std::thread::current().id();
        let reader = read_blocking(&index, |_| Some(std::thread::current().id())).await;
        assert_ne!(reader, Some(caller));

        let fallback: Option<ContentRecord> =
            read_blocking(&index, |_| panic!("read failed")).await;
        assert!(fallback.is_none());
    }

    #[tokio::test]
    async fn test_get_content_by_roothash() {
        let text = tools().get_content_by_roothash("0xA").await;
        assert!(text.starts_with("Content retrieved successfully!\n\nMetadata:\n- RootHash: 0xA\n"));
        assert!(text.contains("- Amount: 0.3 tokens\n"));
        assert!(text.ends_with("Full Content:\nThe full bitcoin article."));
    }

    #[tokio::test]
    async fn test_get_content_unknown_and_undownloadable() {
        let tools = tools();

        let missing = tools.get_content_by_roothash("0xNOPE").await;
        assert!(missing.starts_with("No content found with rootHash: 0xNOPE."));

        // Indexed but the storage network doesn't have it
        let failed = tools.get_content_by_roothash("0xB").await;
        assert!(failed.starts_with("Failed to download content from storage for rootHash: 0xB."));
    }

    #[tokio::test]
    async fn test_call_dispatch() {
        let tools = tools();

        let text = tools
            .call(SEARCH_CONTENT, serde_json::json!({"query": "rollup"}))
            .await
            .unwrap();
        assert!(text.starts_with("Found 1 content item(s)"));

        let stats = tools.call(GET_CONTENT_STATS, Value::Null).await.unwrap();
        assert!(stats.starts_with("Content Statistics:"));

        let err = tools
            .call(GET_CONTENT_BY_ROOTHASH, serde_json::json!({"root_hash": "0xA"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = tools.call("transfer_usdc", Value::Null).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }
}
