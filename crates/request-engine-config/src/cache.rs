//! Cache-tier configuration: sizing, eviction, compression, and obfuscation
//! toggles for the memory and disk tiers.

use std::time::Duration;

/// Configuration governing the two-tier cache's behavior.
///
/// Constructed via [`CacheConfigBuilder`]; see [`crate::presets`] for
/// ready-made configurations.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheConfig {
    pub enable_memory: bool,
    pub enable_disk: bool,
    pub max_memory_bytes: u64,
    pub max_disk_bytes: u64,
    pub default_ttl: Duration,
    pub cleanup_interval: Duration,
    pub enable_compression: bool,
    pub compression_threshold_bytes: u64,
    pub enable_obfuscation: bool,
    pub obfuscation_key: Option<String>,
    pub enable_tag_index: bool,
    pub async_disk_io: bool,
    pub disk_io_buffer_bytes: u64,
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }
}

/// Builder for [`CacheConfig`].
pub struct CacheConfigBuilder {
    enable_memory: bool,
    enable_disk: bool,
    max_memory_bytes: u64,
    max_disk_bytes: u64,
    default_ttl: Duration,
    cleanup_interval: Duration,
    enable_compression: bool,
    compression_threshold_bytes: u64,
    enable_obfuscation: bool,
    obfuscation_key: Option<String>,
    enable_tag_index: bool,
    async_disk_io: bool,
    disk_io_buffer_bytes: u64,
}

impl CacheConfigBuilder {
    pub fn new() -> Self {
        Self {
            enable_memory: true,
            enable_disk: true,
            max_memory_bytes: 20 * 1024 * 1024,
            max_disk_bytes: 200 * 1024 * 1024,
            default_ttl: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
            enable_compression: true,
            compression_threshold_bytes: 1024,
            enable_obfuscation: false,
            obfuscation_key: None,
            enable_tag_index: true,
            async_disk_io: true,
            disk_io_buffer_bytes: 64 * 1024,
        }
    }

    pub fn enable_memory(mut self, enabled: bool) -> Self {
        self.enable_memory = enabled;
        self
    }

    pub fn enable_disk(mut self, enabled: bool) -> Self {
        self.enable_disk = enabled;
        self
    }

    pub fn max_memory_bytes(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    pub fn max_disk_bytes(mut self, bytes: u64) -> Self {
        self.max_disk_bytes = bytes;
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn enable_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    pub fn compression_threshold_bytes(mut self, bytes: u64) -> Self {
        self.compression_threshold_bytes = bytes;
        self
    }

    pub fn enable_obfuscation(mut self, enabled: bool) -> Self {
        self.enable_obfuscation = enabled;
        self
    }

    pub fn obfuscation_key(mut self, key: impl Into<String>) -> Self {
        self.obfuscation_key = Some(key.into());
        self
    }

    pub fn enable_tag_index(mut self, enabled: bool) -> Self {
        self.enable_tag_index = enabled;
        self
    }

    pub fn async_disk_io(mut self, enabled: bool) -> Self {
        self.async_disk_io = enabled;
        self
    }

    pub fn disk_io_buffer_bytes(mut self, bytes: u64) -> Self {
        self.disk_io_buffer_bytes = bytes;
        self
    }

    pub fn build(self) -> CacheConfig {
        CacheConfig {
            enable_memory: self.enable_memory,
            enable_disk: self.enable_disk,
            max_memory_bytes: self.max_memory_bytes,
            max_disk_bytes: self.max_disk_bytes,
            default_ttl: self.default_ttl,
            cleanup_interval: self.cleanup_interval,
            enable_compression: self.enable_compression,
            compression_threshold_bytes: self.compression_threshold_bytes,
            enable_obfuscation: self.enable_obfuscation,
            obfuscation_key: self.obfuscation_key,
            enable_tag_index: self.enable_tag_index,
            async_disk_io: self.async_disk_io,
            disk_io_buffer_bytes: self.disk_io_buffer_bytes,
        }
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
