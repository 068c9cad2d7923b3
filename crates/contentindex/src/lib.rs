//! Content metadata index for pay-to-read content.
//!
//! Every monetized item stored on the decentralized storage network gets one
//! [`ContentRecord`] here, keyed by its `rootHash`. The index is used by:
//! - **upload pipeline**: appends a record after the bytes are stored
//! - **content delivery**: looks a record up before fetching the bytes
//! - **agent tools**: search summaries and report statistics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use contentindex::{ContentRecord, IndexConfig, JsonIndex, MetadataIndex};
//!
//! let index = JsonIndex::new(IndexConfig::with_path("temp/content-metadata.json"));
//!
//! let record = ContentRecord::new("0xroot", "0xtx", "0xwallet")
//!     .with_summary("bitcoin payments explained")
//!     .with_amount("0.3")
//!     .stamped_now();
//!
//! if !index.append(record) {
//!     println!("already indexed");
//! }
//!
//! for hit in index.search("Bitcoin") {
//!     println!("{} -> {}", hit.root_hash, hit.summary);
//! }
//!
//! let stats = index.statistics();
//! println!("{} items, {} earned", stats.total_content, stats.total_earnings);
//! ```
//!
//! # Storage
//!
//! The whole index is one pretty-printed JSON array. Every operation re-reads
//! it; appends rewrite it. Appends sharing a document are serialized through
//! an advisory lock on `<document>.lock`, readers never lock.
//!
//! # Failure policy
//!
//! `read_all`, `search`, `lookup`, `statistics` and `append` never return
//! errors: an unreadable or corrupt document reads as empty and a failed
//! append returns `false`. Each swallowed failure is logged through `tracing`.
//! Use [`JsonIndex::try_read_all`] / [`JsonIndex::try_append`] to see the error.

pub mod config;
pub mod error;
pub mod query;
pub mod record;
pub mod store;

pub use config::IndexConfig;
pub use error::IndexError;
pub use query::{parse_amount, ContentStats};
pub use record::ContentRecord;
pub use store::{AppendOutcome, JsonIndex, MemoryIndex, MetadataIndex};
