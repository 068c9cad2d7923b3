//! JsonIndex: the whole index as one JSON document.
//!
//! Layout:
//! ```text
//! temp/
//! ├── content-metadata.json       # [ {rootHash, txHash, ...}, ... ]
//! └── content-metadata.json.lock  # advisory lock held by appenders
//! ```
//!
//! Every call re-reads the document; nothing is cached between calls. An
//! append is a read-modify-write of the full document: the new array is
//! written to `content-metadata.json.tmp` and renamed over the live document.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::error::IndexError;
use crate::query::{self, ContentStats};
use crate::record::ContentRecord;

/// Result of a successful append attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The record was new and has been written.
    Inserted,
    /// A record with the same `rootHash` already exists; nothing was written.
    Duplicate,
}

/// Trait for metadata index backends.
///
/// Every operation degrades to a neutral value instead of failing: callers
/// are never blocked by a corrupt or missing index. Implementations log what
/// they swallow.
pub trait MetadataIndex: Send + Sync {
    /// Make sure an empty index exists. Idempotent.
    fn initialize(&self) {}

    /// Every record, in stored order. Empty if the index is unreadable.
    fn read_all(&self) -> Vec<ContentRecord>;

    /// Append a record unless its `rootHash` is already present.
    ///
    /// Returns `true` when written; `false` on duplicate or failure.
    fn append(&self, record: ContentRecord) -> bool;

    /// Records whose summary contains `query`, ignoring case.
    fn search(&self, query: &str) -> Vec<ContentRecord> {
        query::search(&self.read_all(), query)
    }

    /// The record with this exact `rootHash`, if any.
    fn lookup(&self, root_hash: &str) -> Option<ContentRecord> {
        query::lookup(&self.read_all(), root_hash)
    }

    /// Counts and sums recomputed from a full scan.
    fn statistics(&self) -> ContentStats {
        query::statistics(&self.read_all())
    }
}

/// File-backed index (single pretty-printed JSON array).
#[derive(Debug, Clone)]
pub struct JsonIndex {
    config: IndexConfig,
}

impl JsonIndex {
    /// Create a handle. Nothing touches the filesystem until first use.
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    /// Create a writable handle for a specific document.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self::new(IndexConfig::with_path(path))
    }

    /// Create a read-only handle for a specific document.
    pub fn read_only_at(path: impl Into<PathBuf>) -> Self {
        Self::new(IndexConfig::read_only(path))
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.index_path
    }

    /// Create the parent directory and an empty `[]` document if absent.
    ///
    /// Uses `create_new` so a concurrent initializer can never clobber a
    /// document another process has just written. Read-only handles do nothing.
    pub fn try_initialize(&self) -> Result<(), IndexError> {
        if self.config.read_only {
            return Ok(());
        }

        let path = self.path();
        if path.exists() {
            return Ok(());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
        }

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let empty = serde_json::to_string_pretty(&Vec::<ContentRecord>::new())
                    .map_err(IndexError::Serialize)?;
                file.write_all(empty.as_bytes())
                    .map_err(|e| IndexError::io(path, e))?;
                debug!(path = %path.display(), "initialized empty content index");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(IndexError::io(path, e)),
        }
    }

    /// Read every record, surfacing I/O and parse errors.
    ///
    /// A read-only handle on a missing document reads as empty.
    #[tracing::instrument(name = "index.read_all", skip(self), fields(path = %self.path().display()))]
    pub fn try_read_all(&self) -> Result<Vec<ContentRecord>, IndexError> {
        self.try_initialize()?;

        let path = self.path();
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound && self.config.read_only => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(IndexError::io(path, e)),
        };

        // A concurrent initializer may not have written `[]` yet.
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&data).map_err(|source| IndexError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Append unless the `rootHash` is already indexed, surfacing errors.
    ///
    /// The read-modify-write runs under an exclusive advisory lock on the
    /// `.lock` sidecar, so appenders sharing this document (in this process or
    /// another) go one at a time.
    #[tracing::instrument(name = "index.append", skip(self, record), fields(root_hash = %record.root_hash))]
    pub fn try_append(&self, record: ContentRecord) -> Result<AppendOutcome, IndexError> {
        if self.config.read_only {
            return Err(IndexError::ReadOnly);
        }

        self.try_initialize()?;
        let _guard = WriterLock::acquire(&self.config.lock_path())?;

        let mut records = self.try_read_all()?;
        if records.iter().any(|r| r.root_hash == record.root_hash) {
            return Ok(AppendOutcome::Duplicate);
        }

        records.push(record);
        self.write_document(&records)?;
        Ok(AppendOutcome::Inserted)
    }

    /// Replace the document with `records`: write a temp sibling, then rename.
    fn write_document(&self, records: &[ContentRecord]) -> Result<(), IndexError> {
        let json = serde_json::to_string_pretty(records).map_err(IndexError::Serialize)?;

        let staging = self.config.staging_path();
        fs::write(&staging, json).map_err(|e| IndexError::io(&staging, e))?;
        fs::rename(&staging, self.path()).map_err(|e| IndexError::io(self.path(), e))?;
        Ok(())
    }
}

impl MetadataIndex for JsonIndex {
    fn initialize(&self) {
        if let Err(e) = self.try_initialize() {
            warn!(path = %self.path().display(), error = %e, "failed to initialize content index");
        }
    }

    fn read_all(&self) -> Vec<ContentRecord> {
        match self.try_read_all() {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path().display(), error = %e, "error reading content index, treating as empty");
                Vec::new()
            }
        }
    }

    fn append(&self, record: ContentRecord) -> bool {
        let root_hash = record.root_hash.clone();
        match self.try_append(record) {
            Ok(AppendOutcome::Inserted) => {
                info!(%root_hash, "content metadata saved");
                true
            }
            Ok(AppendOutcome::Duplicate) => {
                info!(%root_hash, "content with this rootHash already exists");
                false
            }
            Err(e) => {
                warn!(%root_hash, path = %self.path().display(), error = %e, "error saving content metadata");
                false
            }
        }
    }
}

/// Exclusive advisory lock on the sidecar file, released on drop.
struct WriterLock {
    file: File,
}

impl WriterLock {
    fn acquire(path: &Path) -> Result<Self, IndexError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| IndexError::Lock {
                path: path.to_path_buf(),
                source: e,
            })?;

        FileExt::lock_exclusive(&file).map_err(|e| IndexError::Lock {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self { file })
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// In-memory index (Vec-backed). Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    records: RwLock<Vec<ContentRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ContentRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

impl MetadataIndex for MemoryIndex {
    fn read_all(&self) -> Vec<ContentRecord> {
        match self.records.read() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn append(&self, record: ContentRecord) -> bool {
        let mut records = match self.records.write() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        if records.iter().any(|r| r.root_hash == record.root_hash) {
            return false;
        }
        records.push(record);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn index_in(dir: &TempDir) -> JsonIndex {
        JsonIndex::at_path(dir.path().join("temp").join("content-metadata.json"))
    }

    fn bitcoin_record() -> ContentRecord {
        ContentRecord::new("0xA", "0xT1", "0xW1")
            .with_summary("bitcoin payments explained")
            .with_amount("0.3")
            .with_timestamp("2025-01-01T00:00:00Z")
    }

    #[test]
    fn test_empty_store_statistics() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);

        let stats = index.statistics();
        assert_eq!(stats.total_content, 0);
        assert_eq!(stats.total_earnings, 0.0);
        assert_eq!(stats.unique_wallets, 0);
    }

    #[test]
    fn test_initialize_is_idempotent() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let index = index_in(&dir);

        for _ in 0..3 {
            index.initialize();
            assert!(index.read_all().is_empty());
        }

        assert!(index.path().exists());
        assert_eq!(fs::read_to_string(index.path())?, "[]");
        Ok(())
    }

    #[test]
    fn test_append_then_read_all_roundtrip() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let index = index_in(&dir);

        assert!(index.append(bitcoin_record()));

        let all = index.read_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], bitcoin_record());
        Ok(())
    }

    #[test]
    fn test_duplicate_root_hash_is_rejected() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let index = index_in(&dir);

        assert!(index.append(bitcoin_record()));

        let again = bitcoin_record().with_summary("a different summary");
        assert!(!index.append(again.clone()));
        assert_eq!(index.try_append(again)?, AppendOutcome::Duplicate);

        let all = index.read_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].summary, "bitcoin payments explained");
        Ok(())
    }

    #[test]
    fn test_search_after_append() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);
        index.append(bitcoin_record());

        let hits = index.search("Bitcoin");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].root_hash, "0xA");

        assert!(index.search("ethereum").is_empty());
        assert_eq!(index.search("").len(), 1);
    }

    #[test]
    fn test_statistics_after_second_append() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);
        index.append(bitcoin_record());

        let second = ContentRecord::new("0xB", "0xT2", "0xW1")
            .with_summary("lightning channels")
            .with_amount("0.7")
            .with_timestamp("2025-01-02T00:00:00Z");
        assert!(index.append(second));

        let stats = index.statistics();
        assert_eq!(stats.total_content, 2);
        assert_eq!(stats.unique_wallets, 1);
        assert!((stats.total_earnings - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);
        index.append(bitcoin_record());

        assert_eq!(index.lookup("0xA"), Some(bitcoin_record()));
        assert_eq!(index.lookup("0xDOESNOTEXIST"), None);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);

        for root in ["0x3", "0x1", "0x2"] {
            assert!(index.append(ContentRecord::new(root, "tx", "w")));
        }

        let roots: Vec<_> = index.read_all().into_iter().map(|r| r.root_hash).collect();
        assert_eq!(roots, vec!["0x3", "0x1", "0x2"]);
    }

    #[test]
    fn test_document_is_pretty_flat_array() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let index = index_in(&dir);
        index.append(bitcoin_record());

        let text = fs::read_to_string(index.path())?;
        assert!(text.starts_with("[\n  {\n    \"rootHash\": \"0xA\""));

        let value: serde_json::Value = serde_json::from_str(&text)?;
        let object = value[0].as_object().expect("record object");
        let keys: Vec<_> = object.keys().cloned().collect();
        assert_eq!(keys.len(), 6);
        for key in ["rootHash", "txHash", "summary", "wallet_address", "amount", "timestamp"] {
            assert!(object.contains_key(key), "missing {key}");
        }

        assert!(!index.config().staging_path().exists());
        Ok(())
    }

    #[test]
    fn test_reads_existing_document() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("content-metadata.json");
        fs::write(
            &path,
            r#"[
  {
    "rootHash": "0xOLD",
    "txHash": "0xTX",
    "summary": "written by an earlier deployment",
    "wallet_address": "0xW",
    "amount": "2",
    "timestamp": "2024-12-31T23:59:59.000Z"
  }
]"#,
        )?;

        let index = JsonIndex::at_path(&path);
        assert_eq!(index.read_all().len(), 1);
        assert!(index.lookup("0xOLD").is_some());
        Ok(())
    }

    #[test]
    fn test_corrupt_document_reads_empty_and_refuses_append() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("content-metadata.json");
        fs::write(&path, "{ not json")?;

        let index = JsonIndex::at_path(&path);
        assert!(index.read_all().is_empty());
        assert!(index.search("").is_empty());
        assert!(index.lookup("0xA").is_none());
        assert_eq!(index.statistics(), ContentStats::default());
        assert!(matches!(index.try_read_all(), Err(IndexError::Parse { .. })));

        assert!(!index.append(bitcoin_record()));
        // The corrupt document is left untouched.
        assert_eq!(fs::read_to_string(&path)?, "{ not json");
        Ok(())
    }

    #[test]
    fn test_zero_length_document_reads_empty() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("content-metadata.json");
        fs::write(&path, "")?;

        let index = JsonIndex::at_path(&path);
        assert!(index.try_read_all()?.is_empty());
        assert!(index.append(bitcoin_record()));
        assert_eq!(index.read_all().len(), 1);
        Ok(())
    }

    #[test]
    fn test_unreadable_location_is_neutral() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        // A directory where the document should be.
        let path = dir.path().join("content-metadata.json");
        fs::create_dir_all(&path)?;

        let index = JsonIndex::at_path(&path);
        assert!(index.read_all().is_empty());
        assert!(!index.append(bitcoin_record()));
        assert!(matches!(index.try_read_all(), Err(IndexError::Io { .. })));
        Ok(())
    }

    #[test]
    fn test_read_only_refuses_writes() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("content-metadata.json");

        let readonly = JsonIndex::read_only_at(&path);
        assert!(readonly.read_all().is_empty());
        assert!(!path.exists());
        assert!(!readonly.append(bitcoin_record()));
        assert!(matches!(
            readonly.try_append(bitcoin_record()),
            Err(IndexError::ReadOnly)
        ));

        let writable = JsonIndex::at_path(&path);
        assert!(writable.append(bitcoin_record()));
        assert_eq!(readonly.read_all().len(), 1);
        Ok(())
    }

    #[test]
    fn test_uniqueness_over_many_appends() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);

        let roots = ["a", "b", "a", "c", "b", "a", "d"];
        let results: Vec<bool> = roots
            .iter()
            .map(|root| index.append(ContentRecord::new(*root, "tx", "w")))
            .collect();
        assert_eq!(results, vec![true, true, false, true, false, false, true]);

        let mut stored: Vec<_> = index.read_all().into_iter().map(|r| r.root_hash).collect();
        let total = stored.len();
        stored.sort();
        stored.dedup();
        assert_eq!(total, stored.len());
        assert_eq!(total, 4);
    }

    #[test]
    fn test_concurrent_appends_keep_every_record() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = Arc::new(dir.path().join("content-metadata.json"));

        let mut handles = vec![];
        for t in 0..8 {
            let path = Arc::clone(&path);
            handles.push(thread::spawn(move || {
                // Separate handles, as separate request handlers would have.
                let index = JsonIndex::at_path(path.as_path());
                for i in 0..5 {
                    let record = ContentRecord::new(format!("0x{t}-{i}"), "tx", format!("w{t}"));
                    assert!(index.append(record));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let index = JsonIndex::at_path(path.as_path());
        assert_eq!(index.read_all().len(), 40);
        assert_eq!(index.statistics().unique_wallets, 8);
        Ok(())
    }

    #[test]
    fn test_memory_index() {
        let index = MemoryIndex::new();
        assert!(index.append(bitcoin_record()));
        assert!(!index.append(bitcoin_record()));
        assert_eq!(index.read_all().len(), 1);
        assert_eq!(index.search("PAYMENTS").len(), 1);
        assert_eq!(index.lookup("0xA"), Some(bitcoin_record()));
        assert_eq!(index.statistics().total_content, 1);
    }
}
