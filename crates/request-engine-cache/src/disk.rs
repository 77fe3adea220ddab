//! The disk tier: one file per key under a platform cache directory,
//! optionally GZIP-compressed and/or obfuscated (§4.3, §6).
//!
//! Operations are serialized by the caller (`CacheStore` holds a single
//! `tokio::sync::Mutex<DiskTier>`) rather than by this type itself, per
//! §5's "Cache disk directory: protected by the cache disk lock; all file
//! open/read/write/delete are serialized."

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use request_engine_core::Priority;
use sha2::{Digest, Sha256};

use crate::entry::{CacheEntry, decode_envelope, encode_envelope};

/// Directory name under the platform application-cache directory (§6).
pub const CACHE_DIR_NAME: &str = "network_cache";

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolves the default disk cache location: `<platform cache dir>/network_cache/`,
/// falling back to the system temp directory if the platform cache
/// directory can't be determined (e.g. a minimal container).
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}

struct DiskIndexEntry {
    size: u64,
    priority: Priority,
    last_accessed_at: SystemTime,
}

/// Lightweight metadata mirror so eviction can rank candidates without
/// reading every file back off disk. The directory listing remains the
/// source of truth (§6: "No index file"); this index is rebuilt by
/// [`DiskTier::open`] scanning the directory, never persisted itself.
pub(crate) struct DiskTier {
    base_dir: PathBuf,
    max_bytes: u64,
    obfuscation_key: Option<String>,
    index: HashMap<String, DiskIndexEntry>,
    used_bytes: u64,
}

impl DiskTier {
    /// Creates the cache directory if missing and rebuilds the metadata
    /// index by reading every `*.cache` file's envelope header. Corrupt
    /// files encountered during the scan are deleted, matching the normal
    /// read-path corruption policy.
    pub(crate) async fn open(
        base_dir: PathBuf,
        max_bytes: u64,
        obfuscation_key: Option<String>,
    ) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&base_dir).await?;

        let mut index = HashMap::new();
        let mut used_bytes = 0u64;
        let mut read_dir = tokio::fs::read_dir(&base_dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("cache") {
                continue;
            }
            match tokio::fs::read(&path).await {
                Ok(bytes) => match decode_envelope(&bytes, obfuscation_key.as_deref()) {
                    Some(decoded) => {
                        used_bytes += decoded.size();
                        index.insert(
                            decoded.key.clone(),
                            DiskIndexEntry {
                                size: decoded.size(),
                                priority: decoded.priority,
                                last_accessed_at: decoded.last_accessed_at,
                            },
                        );
                    }
                    None => {
                        let _ = tokio::fs::remove_file(&path).await;
                    }
                },
                Err(_) => {
                    let _ = tokio::fs::remove_file(&path).await;
                }
            }
        }

        Ok(Self {
            base_dir,
            max_bytes,
            obfuscation_key,
            index,
            used_bytes,
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.cache", hash_key(key)))
    }

    pub(crate) fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Reads and validates the entry for `key`. Any structural failure
    /// deletes the file and returns `Ok(None)` (§4.3: corruption → miss).
    pub(crate) async fn get(&mut self, key: &str, now: SystemTime) -> std::io::Result<Option<CacheEntry>> {
        if !self.index.contains_key(key) {
            return Ok(None);
        }
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => {
                self.forget(key);
                return Ok(None);
            }
        };

        match decode_envelope(&bytes, self.obfuscation_key.as_deref()) {
            Some(entry) if !entry.is_expired(now) => Ok(Some(entry)),
            Some(_) => {
                // Expired: a disk `get` on it is a miss, and we reclaim the
                // file rather than waiting for the next sweep.
                self.remove(key).await?;
                Ok(None)
            }
            None => {
                let _ = tokio::fs::remove_file(&path).await;
                self.forget(key);
                Ok(None)
            }
        }
    }

    /// Writes `entry`, evicting lowest-(priority, last_accessed_at) entries
    /// first if needed to stay within `max_bytes`, mirroring the memory
    /// tier's policy (§4.3 applies the same ordering to both tiers).
    pub(crate) async fn set(&mut self, entry: &CacheEntry) -> std::io::Result<Vec<String>> {
        let incoming_size = entry.size();
        if let Some(old) = self.index.remove(&entry.key) {
            self.used_bytes = self.used_bytes.saturating_sub(old.size);
        }

        let mut evicted = Vec::new();
        if self.max_bytes > 0 && self.used_bytes + incoming_size > self.max_bytes {
            let target = (self.max_bytes * 8) / 10;
            let mut candidates: Vec<(String, Priority, SystemTime)> = self
                .index
                .iter()
                .map(|(k, v)| (k.clone(), v.priority, v.last_accessed_at))
                .collect();
            candidates.sort_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)));

            for (candidate_key, _, _) in candidates {
                if self.used_bytes + incoming_size <= target {
                    break;
                }
                self.remove(&candidate_key).await?;
                evicted.push(candidate_key);
            }
        }

        let bytes = encode_envelope(entry, self.obfuscation_key.as_deref());
        tokio::fs::write(self.path_for(&entry.key), bytes).await?;

        self.index.insert(
            entry.key.clone(),
            DiskIndexEntry {
                size: incoming_size,
                priority: entry.priority,
                last_accessed_at: entry.last_accessed_at,
            },
        );
        self.used_bytes += incoming_size;

        Ok(evicted)
    }

    pub(crate) async fn remove(&mut self, key: &str) -> std::io::Result<()> {
        if self.index.remove(key).is_none() {
            return Ok(());
        }
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) | Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn forget(&mut self, key: &str) {
        if let Some(removed) = self.index.remove(key) {
            self.used_bytes = self.used_bytes.saturating_sub(removed.size);
        }
    }

    pub(crate) async fn clear(&mut self) -> std::io::Result<()> {
        let keys: Vec<String> = self.index.keys().cloned().collect();
        for key in keys {
            self.remove(&key).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn entry(key: &str, size: usize, priority: Priority) -> CacheEntry {
        CacheEntry::new(
            key,
            vec![7u8; size],
            Duration::from_secs(60),
            priority,
            HashSet::new(),
            false,
            false,
        )
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut tier = DiskTier::open(dir.path().to_path_buf(), 10_000, None)
            .await
            .unwrap();
        tier.set(&entry("k", 64, Priority::Normal)).await.unwrap();

        let got = tier.get("k", SystemTime::now()).await.unwrap().unwrap();
        assert_eq!(got.size(), 64);
    }

    #[tokio::test]
    async fn remove_deletes_file_and_index_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut tier = DiskTier::open(dir.path().to_path_buf(), 10_000, None)
            .await
            .unwrap();
        tier.set(&entry("k", 10, Priority::Normal)).await.unwrap();
        tier.remove("k").await.unwrap();

        assert!(tier.get("k", SystemTime::now()).await.unwrap().is_none());
        assert!(!tier.contains("k"));
    }

    #[tokio::test]
    async fn corrupt_file_is_deleted_and_reported_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let mut tier = DiskTier::open(dir.path().to_path_buf(), 10_000, None)
            .await
            .unwrap();
        tier.set(&entry("k", 10, Priority::Normal)).await.unwrap();

        let path = tier.path_for("k");
        tokio::fs::write(&path, b"not a valid envelope").await.unwrap();

        let result = tier.get("k", SystemTime::now()).await.unwrap();
        assert!(result.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn reopen_rebuilds_index_from_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut tier = DiskTier::open(dir.path().to_path_buf(), 10_000, None)
                .await
                .unwrap();
            tier.set(&entry("k1", 10, Priority::Normal)).await.unwrap();
            tier.set(&entry("k2", 20, Priority::High)).await.unwrap();
        }

        let reopened = DiskTier::open(dir.path().to_path_buf(), 10_000, None)
            .await
            .unwrap();
        assert!(reopened.contains("k1"));
        assert!(reopened.contains("k2"));
        assert_eq!(reopened.used_bytes(), 30);
    }

    #[tokio::test]
    async fn eviction_respects_max_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut tier = DiskTier::open(dir.path().to_path_buf(), 1000, None)
            .await
            .unwrap();
        tier.set(&entry("a", 400, Priority::Low)).await.unwrap();
        tier.set(&entry("b", 400, Priority::Low)).await.unwrap();
        let evicted = tier.set(&entry("c", 400, Priority::Normal)).await.unwrap();

        assert_eq!(evicted, vec!["a".to_string()]);
        assert!(tier.used_bytes() <= 1000);
    }
}
