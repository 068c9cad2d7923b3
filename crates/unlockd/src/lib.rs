//! unlockd - HTTP gateway for pay-to-read content.
//!
//! Creators upload text through `POST /api/send`; the bytes go to a
//! decentralized storage relay, a summary comes from an LLM endpoint and the
//! metadata lands in the [`contentindex`] JSON index. Readers and agents find
//! content through search, statistics and the agent tool surface, then fetch
//! it by `rootHash`.

pub mod serve;
pub mod storage;
pub mod summarize;
pub mod telemetry;
pub mod tools;
pub mod upload;
pub mod web;

pub use storage::{GatewayError, HttpStorageGateway, StorageGateway, UploadReceipt};
pub use summarize::{ChatSummarizer, DisabledSummarizer, Summarizer};
pub use tools::{ContentTools, ToolError, ToolInfo};
pub use upload::{SendReceipt, SendRequest, UploadError, UploadPipeline};
pub use web::WebState;
