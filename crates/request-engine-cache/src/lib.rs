//! Two-tier (memory + disk) cache store with TTL, priority+LRU eviction,
//! tag-based group invalidation, and optional compression/obfuscation
//! (§4.3).
//!
//! # Concurrency model (§5)
//!
//! The memory tier and disk tier are guarded by two separate locks, never
//! held across the same await point as each other: memory operations are
//! synchronous and cheap, so the memory lock is a short-lived
//! [`std::sync::Mutex`]; disk operations are `async` file I/O, so the disk
//! lock is a [`tokio::sync::Mutex`]. A `set()` that populates both tiers
//! always releases the memory lock before awaiting the disk lock.

mod disk;
mod entry;
mod memory;
mod stats;
mod tags;

pub use entry::CacheEntry;
pub use stats::CacheStatisticsSnapshot;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, SystemTime};

use request_engine_config::CacheConfig;
use request_engine_core::{EngineError, ErrorCode, LogContext, Logger, NoopLogger, Spawner, TaskHandle, TokioSpawner};
use tokio::sync::Mutex as AsyncMutex;

use disk::DiskTier;
use memory::MemoryTier;
use stats::CacheStatistics;
use tags::TagIndex;

/// Options accompanying a `set`, mirroring §4.3's per-entry overrides.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub priority: Option<request_engine_core::Priority>,
    pub tags: HashSet<String>,
}

struct Inner {
    config: CacheConfig,
    memory: StdMutex<MemoryTier>,
    disk: AsyncMutex<Option<DiskTier>>,
    tags: StdMutex<TagIndex>,
    stats: CacheStatistics,
    disposed: std::sync::atomic::AtomicBool,
    logger: Arc<dyn Logger>,
    spawner: Arc<dyn Spawner>,
    /// Handles for disk writes spawned under `async_disk_io`, awaited by
    /// `clear()`/`dispose()` so neither returns while a write is still in
    /// flight (§4.3: "awaits in-flight disk writes").
    pending_disk_writes: AsyncMutex<Vec<TaskHandle>>,
}

/// The public cache API used by the queue/executor crates.
///
/// Cheaply cloneable: internally an `Arc`, so the background cleanup task
/// and callers share the same tiers.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<Inner>,
    cleanup_task: Arc<StdMutex<Option<TaskHandle>>>,
}

fn operation_error(message: &str) -> EngineError {
    EngineError::new(ErrorCode::OperationFailed, message.to_string())
}

impl CacheStore {
    /// Opens the store, rebuilding the disk tier's index from its directory
    /// listing if `config.enable_disk` is set. `base_dir` overrides the
    /// platform cache directory, mainly for tests.
    pub async fn open(config: CacheConfig, base_dir: Option<std::path::PathBuf>) -> Result<Self, EngineError> {
        Self::open_with_logger(config, base_dir, Arc::new(NoopLogger)).await
    }

    pub async fn open_with_logger(
        config: CacheConfig,
        base_dir: Option<std::path::PathBuf>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, EngineError> {
        let disk = if config.enable_disk {
            let dir = base_dir.unwrap_or_else(disk::default_cache_dir);
            match DiskTier::open(dir, config.max_disk_bytes, config.obfuscation_key.clone()).await {
                Ok(tier) => Some(tier),
                Err(e) => {
                    logger.warn(&LogContext::new("cache"), &format!("disk open failed: {e}"));
                    None
                }
            }
        } else {
            None
        };

        let inner = Arc::new(Inner {
            memory: StdMutex::new(MemoryTier::new(config.max_memory_bytes)),
            disk: AsyncMutex::new(disk),
            tags: StdMutex::new(TagIndex::new()),
            stats: CacheStatistics::default(),
            disposed: std::sync::atomic::AtomicBool::new(false),
            config,
            logger,
            spawner: Arc::new(TokioSpawner),
            pending_disk_writes: AsyncMutex::new(Vec::new()),
        });

        let store = Self {
            inner,
            cleanup_task: Arc::new(StdMutex::new(None)),
        };
        store.start_cleanup_task(Arc::new(TokioSpawner));
        Ok(store)
    }

    fn start_cleanup_task(&self, spawner: Arc<dyn Spawner>) {
        let interval = self.inner.config.cleanup_interval;
        if interval.is_zero() {
            return;
        }
        let store = self.clone();
        let handle = spawner.spawn(Box::pin(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if store.inner.disposed.load(std::sync::atomic::Ordering::SeqCst) {
                    return;
                }
                store.sweep_expired().await;
            }
        }));
        *self.cleanup_task.lock().expect("cleanup task lock poisoned") = Some(handle);
    }

    /// Removes expired entries from the memory tier (§4.3 "Background
    /// cleanup"). Runs on the configured `cleanup_interval`, and can be
    /// invoked directly by tests without waiting on the timer. Disk entries
    /// are validated lazily on `get`, since there is no persisted expiry
    /// index separate from each entry's own envelope (§6).
    pub async fn sweep_expired(&self) {
        let now = SystemTime::now();

        let expired_memory: Vec<String> = {
            let memory = self.inner.memory.lock().expect("memory lock poisoned");
            memory.peek_expired_keys(now)
        };
        if !expired_memory.is_empty() {
            let mut memory = self.inner.memory.lock().expect("memory lock poisoned");
            let mut tags = self.inner.tags.lock().expect("tags lock poisoned");
            for key in &expired_memory {
                memory.remove(key);
                tags.remove_key(key);
            }
        }
    }

    fn check_disposed(&self) -> Result<(), EngineError> {
        if self.inner.disposed.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(operation_error("cache store has been disposed"));
        }
        Ok(())
    }

    /// Looks up `key`, checking memory first and then disk, promoting a disk
    /// hit into the memory tier (§4.3: "A disk hit is promoted to memory").
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, EngineError> {
        self.check_disposed()?;
        let now = SystemTime::now();

        if self.inner.config.enable_memory {
            let found = {
                let mut memory = self.inner.memory.lock().expect("memory lock poisoned");
                memory.get(key, now)
            };
            if let Some(entry) = found {
                self.inner.stats.record_memory_hit();
                #[cfg(feature = "metrics")]
                metrics::counter!("request_engine_cache_hit_total", "tier" => "memory").increment(1);
                return Ok(Some(entry));
            }
        }

        if self.inner.config.enable_disk {
            let mut disk_guard = self.inner.disk.lock().await;
            if let Some(disk) = disk_guard.as_mut() {
                match disk.get(key, now).await {
                    Ok(Some(entry)) => {
                        drop(disk_guard);
                        self.inner.stats.record_disk_hit();
                        #[cfg(feature = "metrics")]
                        metrics::counter!("request_engine_cache_hit_total", "tier" => "disk").increment(1);
                        if self.inner.config.enable_memory {
                            let mut memory = self.inner.memory.lock().expect("memory lock poisoned");
                            memory.insert(entry.clone());
                        }
                        return Ok(Some(entry));
                    }
                    Ok(None) => {}
                    Err(e) => self
                        .inner
                        .logger
                        .warn(&LogContext::new("cache"), &format!("disk get failed: {e}")),
                }
            }
        }

        self.inner.stats.record_miss();
        #[cfg(feature = "metrics")]
        metrics::counter!("request_engine_cache_miss_total").increment(1);
        Ok(None)
    }

    /// Stores `payload` under `key`. The memory lock is released before the
    /// disk tier is touched; a disk write failure is logged and swallowed,
    /// never surfaced to the caller (§4.3, §9).
    pub async fn set(&self, key: &str, payload: Vec<u8>, options: SetOptions) -> Result<(), EngineError> {
        self.check_disposed()?;

        let ttl = options.ttl.unwrap_or(self.inner.config.default_ttl);
        let priority = options.priority.unwrap_or(request_engine_core::Priority::Normal);
        let compressed = self.inner.config.enable_compression
            && payload.len() as u64 >= self.inner.config.compression_threshold_bytes;
        let obfuscated = self.inner.config.enable_obfuscation;

        let entry = CacheEntry::new(key, payload, ttl, priority, options.tags.clone(), compressed, obfuscated);

        if self.inner.config.enable_tag_index && !options.tags.is_empty() {
            let mut tags = self.inner.tags.lock().expect("tags lock poisoned");
            tags.set(key, &options.tags);
        }

        if self.inner.config.enable_memory {
            let evicted = {
                let mut memory = self.inner.memory.lock().expect("memory lock poisoned");
                memory.insert(entry.clone())
            };
            if !evicted.is_empty() {
                let mut tags = self.inner.tags.lock().expect("tags lock poisoned");
                for ev in evicted {
                    tags.remove_key(&ev.key);
                }
            }
        }

        if self.inner.config.enable_disk {
            if self.inner.config.async_disk_io {
                let inner = Arc::clone(&self.inner);
                let handle = self
                    .inner
                    .spawner
                    .spawn(Box::pin(async move { write_disk_entry(inner, entry).await }));
                self.inner.pending_disk_writes.lock().await.push(handle);
            } else {
                write_disk_entry(Arc::clone(&self.inner), entry).await;
            }
        }

        self.inner.stats.record_set();
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), EngineError> {
        self.check_disposed()?;

        {
            let mut memory = self.inner.memory.lock().expect("memory lock poisoned");
            memory.remove(key);
        }
        {
            let mut tags = self.inner.tags.lock().expect("tags lock poisoned");
            tags.remove_key(key);
        }
        if self.inner.config.enable_disk {
            let mut disk_guard = self.inner.disk.lock().await;
            if let Some(disk) = disk_guard.as_mut() {
                if let Err(e) = disk.remove(key).await {
                    self.inner
                        .logger
                        .warn(&LogContext::new("cache"), &format!("disk remove failed: {e}"));
                }
            }
        }
        Ok(())
    }

    /// Awaits every disk write spawned under `async_disk_io` that hasn't
    /// completed yet. A no-op when `async_disk_io` is disabled, since writes
    /// are already synchronous in that mode.
    async fn await_pending_disk_writes(&self) {
        let handles: Vec<TaskHandle> = {
            let mut pending = self.inner.pending_disk_writes.lock().await;
            std::mem::take(&mut *pending)
        };
        for handle in handles {
            handle.join().await;
        }
    }

    pub async fn clear(&self) -> Result<(), EngineError> {
        self.check_disposed()?;
        self.await_pending_disk_writes().await;

        {
            let mut memory = self.inner.memory.lock().expect("memory lock poisoned");
            memory.clear();
        }
        {
            let mut tags = self.inner.tags.lock().expect("tags lock poisoned");
            tags.clear();
        }
        if self.inner.config.enable_disk {
            let mut disk_guard = self.inner.disk.lock().await;
            if let Some(disk) = disk_guard.as_mut() {
                if let Err(e) = disk.clear().await {
                    self.inner
                        .logger
                        .warn(&LogContext::new("cache"), &format!("disk clear failed: {e}"));
                }
            }
        }
        Ok(())
    }

    /// Invalidates every entry tagged with `tag` (§4.3 "Tag-based
    /// invalidation").
    pub async fn clear_by_tag(&self, tag: &str) -> Result<(), EngineError> {
        self.clear_by_tags(std::slice::from_ref(&tag.to_string())).await
    }

    /// Invalidates every entry tagged with any of `tags`. Keys are copied
    /// out of the tag index before removal so the removal loop never
    /// mutates the structure it's iterating (§9 Open Question).
    pub async fn clear_by_tags(&self, tags: &[String]) -> Result<(), EngineError> {
        self.check_disposed()?;

        let keys: Vec<String> = {
            let index = self.inner.tags.lock().expect("tags lock poisoned");
            index.keys_for_tags(tags).into_iter().collect()
        };
        for key in &keys {
            self.remove(key).await?;
        }
        Ok(())
    }

    pub fn statistics(&self) -> CacheStatisticsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn reset_statistics(&self) {
        self.inner.stats.reset();
    }

    /// Stops the background cleanup task and marks the store as disposed.
    /// After this call every operation returns an operational
    /// [`EngineError`] (§5).
    pub async fn dispose(&self) {
        self.inner.disposed.store(true, std::sync::atomic::Ordering::SeqCst);
        if let Some(handle) = self.cleanup_task.lock().expect("cleanup task lock poisoned").take() {
            handle.abort();
        }
        self.await_pending_disk_writes().await;
    }
}

/// Performs the actual disk-tier write for `entry`, logging and swallowing
/// any I/O failure (§4.3, §9: disk failures degrade to memory-only rather
/// than propagating to the caller). Shared by the synchronous and
/// `async_disk_io`-spawned write paths.
async fn write_disk_entry(inner: Arc<Inner>, entry: CacheEntry) {
    let mut disk_guard = inner.disk.lock().await;
    if let Some(disk) = disk_guard.as_mut() {
        if let Err(e) = disk.set(&entry).await {
            inner
                .logger
                .warn(&LogContext::new("cache"), &format!("disk set failed: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use request_engine_config::CacheConfig;
    use request_engine_core::Priority;

    async fn store(max_memory: u64, max_disk: u64) -> (CacheStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::builder()
            .max_memory_bytes(max_memory)
            .max_disk_bytes(max_disk)
            .cleanup_interval(Duration::from_secs(3600))
            .build();
        let store = CacheStore::open(config, Some(dir.path().to_path_buf())).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn set_then_get_hits_memory() {
        let (store, _dir) = store(10_000, 10_000).await;
        store
            .set("k", b"hello".to_vec(), SetOptions::default())
            .await
            .unwrap();

        let got = store.get("k").await.unwrap().unwrap();
        assert_eq!(got.payload, b"hello");
        assert_eq!(store.statistics().memory_hits, 1);
    }

    #[tokio::test]
    async fn disk_hit_is_promoted_to_memory() {
        let (store, _dir) = store(10_000, 10_000).await;
        store
            .set("k", b"hello".to_vec(), SetOptions::default())
            .await
            .unwrap();

        // Evict from memory directly to force the next get to come from disk.
        {
            let mut memory = store.inner.memory.lock().unwrap();
            memory.remove("k");
        }

        let got = store.get("k").await.unwrap();
        assert!(got.is_some());
        assert_eq!(store.statistics().disk_hits, 1);

        let promoted = {
            let mut memory = store.inner.memory.lock().unwrap();
            memory.get("k", SystemTime::now())
        };
        assert!(promoted.is_some());
    }

    #[tokio::test]
    async fn clear_by_tag_removes_only_tagged_entries() {
        let (store, _dir) = store(10_000, 10_000).await;
        let mut tags1 = HashSet::new();
        tags1.insert("user".to_string());
        store
            .set(
                "u:1",
                b"a".to_vec(),
                SetOptions {
                    tags: tags1,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store.set("p:1", b"b".to_vec(), SetOptions::default()).await.unwrap();

        store.clear_by_tag("user").await.unwrap();

        assert!(store.get("u:1").await.unwrap().is_none());
        assert!(store.get("p:1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dispose_makes_every_operation_return_an_operational_error() {
        let (store, _dir) = store(10_000, 10_000).await;
        store.dispose().await;

        assert!(store.get("k").await.is_err());
        assert!(store.set("k", b"x".to_vec(), SetOptions::default()).await.is_err());
        assert!(store.remove("k").await.is_err());
        assert!(store.clear().await.is_err());
    }

    #[tokio::test]
    async fn priority_survives_eviction_pressure() {
        let (store, _dir) = store(1000, 1000).await;
        store
            .set(
                "low",
                vec![0u8; 300],
                SetOptions {
                    priority: Some(Priority::Low),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .set(
                "critical",
                vec![0u8; 300],
                SetOptions {
                    priority: Some(Priority::Critical),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(store.get("critical").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn async_disk_io_write_is_durable_once_clear_returns() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::builder()
            .max_memory_bytes(10_000)
            .max_disk_bytes(10_000)
            .cleanup_interval(Duration::from_secs(3600))
            .async_disk_io(true)
            .build();
        let store = CacheStore::open(config, Some(dir.path().to_path_buf())).await.unwrap();

        store.set("k", b"hello".to_vec(), SetOptions::default()).await.unwrap();
        // clear() must await any in-flight async disk write before returning
        // (§4.3); if it didn't, the write below could race the clear's own
        // disk wipe and leave the file behind.
        store.clear().await.unwrap();

        let reopened = CacheStore::open(
            CacheConfig::builder()
                .max_memory_bytes(10_000)
                .max_disk_bytes(10_000)
                .cleanup_interval(Duration::from_secs(3600))
                .async_disk_io(true)
                .build(),
            Some(dir.path().to_path_buf()),
        )
        .await
        .unwrap();
        assert!(reopened.get("k").await.unwrap().is_none());
    }
}
