//! Quota-enforced key→bytes storage on disk.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use fotex_model::PhotoSize;

use crate::config::{StoreLimits, available_disk_space, blob_root_for_namespace};
use crate::error::{CacheError, Result};

/// Root directory for one blob-store namespace.
///
/// This is a dedicated directory that `cacache` manages internally
/// (index + content-addressed blobs).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BlobRoot(PathBuf);

impl BlobRoot {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Debug for BlobRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlobRoot").field(&self.0).finish()
    }
}

/// Stable key for locating a blob within a store.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BlobKey(String);

impl BlobKey {
    pub fn new(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlobKey").field(&self.0).finish()
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the stable blob key for a photo's bytes in a given size.
///
/// Must remain stable across releases and is intentionally:
/// - human-readable
/// - versioned (prefix)
/// - specific to the logical size to avoid collisions
pub fn photo_blob_key_for(id: &str, size: PhotoSize) -> BlobKey {
    BlobKey(format!("photos/v1/{}/{}", id, size.as_str()))
}

/// Usage counter updated with CAS loops so concurrent stores and
/// deletes never lose an update.
#[derive(Debug)]
struct UsageBytes(AtomicU64);

impl UsageBytes {
    fn new(initial: u64) -> Self {
        Self(AtomicU64::new(initial))
    }

    fn load(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn add_saturating(&self, add: u64) {
        let mut current = self.load();
        loop {
            let next = current.saturating_add(add);
            match self.0.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    fn sub_saturating(&self, sub: u64) {
        let mut current = self.load();
        loop {
            let next = current.saturating_sub(sub);
            match self.0.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Disk-backed key→bytes store under a fixed capacity ceiling.
///
/// There is no eviction policy: once capacity is reached, every
/// further store fails until the consumer deletes entries.
#[derive(Debug)]
pub struct BlobStore {
    root: BlobRoot,
    capacity_bytes: u64,
    usage_bytes: UsageBytes,
}

impl BlobStore {
    /// Open (or create) the store for a logical namespace, rooted in
    /// the platform cache directory.
    pub fn try_new_for_namespace(
        namespace: &str,
        limits: &StoreLimits,
    ) -> anyhow::Result<Self> {
        let root = blob_root_for_namespace(namespace)?;
        Self::try_new(root, limits.capacity_bytes)
    }

    /// Open (or create) the store rooted at `root`.
    ///
    /// Fails when the requested capacity exceeds the space currently
    /// available on the backing disk, or when the root directory
    /// cannot be created. The usage counter is recomputed from the
    /// on-disk index so a restart observes real usage.
    pub fn try_new(root: BlobRoot, capacity_bytes: u64) -> anyhow::Result<Self> {
        let free = available_disk_space(root.as_path());
        if capacity_bytes > free {
            anyhow::bail!(
                "requested capacity {capacity_bytes} bytes exceeds available disk space {free}"
            );
        }
        std::fs::create_dir_all(root.as_path())?;

        let usage = compute_indexed_usage_bytes_sync(root.as_path());
        Ok(Self {
            root,
            capacity_bytes,
            usage_bytes: UsageBytes::new(usage),
        })
    }

    pub fn root(&self) -> &BlobRoot {
        &self.root
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// Bytes currently tracked against the capacity ceiling.
    pub fn usage_bytes(&self) -> u64 {
        self.usage_bytes.load()
    }

    /// Write `bytes` under `key`, counting them against the quota.
    ///
    /// Overwriting an existing key reconciles the counter against
    /// the previous entry size. On [`CacheError::QuotaExceeded`] the
    /// counter is left unchanged.
    pub async fn store(&self, key: &BlobKey, bytes: &[u8]) -> Result<()> {
        let len = bytes.len() as u64;
        let usage = self.usage_bytes.load();
        if usage.saturating_add(len) >= self.capacity_bytes {
            return Err(CacheError::QuotaExceeded {
                requested: len,
                usage,
                capacity: self.capacity_bytes,
            });
        }
        let free = available_disk_space(self.root.as_path());
        if len >= free {
            return Err(CacheError::QuotaExceeded {
                requested: len,
                usage,
                capacity: self.capacity_bytes,
            });
        }

        let old_size = match cacache::metadata(self.root.as_path(), key.as_str()).await {
            Ok(Some(m)) => Some(m.size as u64),
            Ok(None) => None,
            Err(e) => {
                log::debug!(
                    "blob store write preflight metadata failed; key={}, err={e}",
                    key
                );
                None
            }
        };

        cacache::write(self.root.as_path(), key.as_str(), bytes)
            .await
            .map_err(|e| CacheError::Internal(format!("cacache write failed: {e}")))?;

        if let Some(old) = old_size {
            self.usage_bytes.sub_saturating(old);
        }
        self.usage_bytes.add_saturating(len);
        Ok(())
    }

    /// Read the bytes stored under `key`.
    pub async fn read(&self, key: &BlobKey) -> Result<Vec<u8>> {
        cacache::read(self.root.as_path(), key.as_str())
            .await
            .map_err(|e| match e {
                cacache::Error::EntryNotFound(_, _) => {
                    CacheError::NotFound(format!("blob not found: {key}"))
                }
                cacache::Error::IntegrityError(err) => CacheError::InvalidBlob(
                    format!("blob failed integrity check: {key} ({err})"),
                ),
                cacache::Error::SizeMismatch(wanted, actual) => {
                    CacheError::InvalidBlob(format!(
                        "blob size mismatch: key={key}, wanted={wanted}, actual={actual}"
                    ))
                }
                cacache::Error::IoError(_, msg) => {
                    CacheError::Internal(format!("cacache read I/O error: {msg}"))
                }
                cacache::Error::SerdeError(_, msg) => {
                    CacheError::Internal(format!("cacache read serde error: {msg}"))
                }
            })
    }

    /// Remove the blob under `key`, releasing its bytes from the
    /// quota. Removing an absent key succeeds.
    pub async fn delete(&self, key: &BlobKey) -> Result<()> {
        let old_size = match cacache::metadata(self.root.as_path(), key.as_str()).await {
            Ok(Some(m)) => Some(m.size as u64),
            Ok(None) => None,
            Err(e) => {
                log::debug!(
                    "blob store delete preflight metadata failed; key={}, err={e}",
                    key
                );
                None
            }
        };

        let r_opts = cacache::index::RemoveOpts::new().remove_fully(true);
        r_opts
            .remove(self.root.as_path(), key.as_str())
            .await
            .map_err(|e| CacheError::Internal(format!("cacache remove failed: {e}")))?;

        if let Some(old) = old_size {
            self.usage_bytes.sub_saturating(old);
        }
        Ok(())
    }
}

fn compute_indexed_usage_bytes_sync(root: &Path) -> u64 {
    let mut total: u64 = 0;
    for entry in cacache::index::ls(root) {
        match entry {
            Ok(m) => total = total.saturating_add(m.size as u64),
            Err(e) => log::warn!("blob store index ls entry error: {e}"),
        }
    }
    total
}
