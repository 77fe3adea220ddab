//! Cache entry representation, the disk envelope it serializes to, and the
//! compress/obfuscate codec (§4.3, §8's encode/decode round-trip law).

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::read::{GzDecoder, GzEncoder};
use request_engine_core::Priority;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// An entry held by the memory tier, or staged for/read from the disk tier.
///
/// `size` is always the byte length of `payload` (§3 invariant): it is
/// derived, never set independently, so the two can't drift apart.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Vec<u8>,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
    pub priority: Priority,
    pub access_count: u64,
    pub last_accessed_at: SystemTime,
    pub tags: HashSet<String>,
    pub compressed: bool,
    pub obfuscated: bool,
}

impl CacheEntry {
    pub fn new(
        key: impl Into<String>,
        payload: Vec<u8>,
        ttl: Duration,
        priority: Priority,
        tags: HashSet<String>,
        compressed: bool,
        obfuscated: bool,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            key: key.into(),
            payload,
            created_at: now,
            expires_at: now + ttl,
            priority,
            access_count: 0,
            last_accessed_at: now,
            tags,
            compressed,
            obfuscated,
        }
    }

    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    pub fn touch(&mut self, now: SystemTime) {
        self.access_count += 1;
        self.last_accessed_at = now;
    }
}

/// JSON envelope written to `<hash(key)>.cache`. Field names match §4.3's
/// disk representation table; the struct is intentionally flat so the file
/// format has no index file and no nested versioning scheme to maintain
/// (§6: "Format is not promised stable across versions").
#[derive(Debug, Serialize, Deserialize)]
struct DiskEnvelope {
    key: String,
    data: String,
    #[serde(rename = "expiresAtMs")]
    expires_at_ms: u128,
    #[serde(rename = "priorityOrdinal")]
    priority_ordinal: u8,
    size: u64,
    #[serde(rename = "accessCount")]
    access_count: u64,
    #[serde(rename = "lastAccessedAtMs")]
    last_accessed_at_ms: u128,
    tags: Vec<String>,
    compressed: bool,
    obfuscated: bool,
}

fn priority_ordinal(priority: Priority) -> u8 {
    match priority {
        Priority::Low => 0,
        Priority::Normal => 1,
        Priority::High => 2,
        Priority::Critical => 3,
    }
}

fn priority_from_ordinal(ordinal: u8) -> Priority {
    match ordinal {
        0 => Priority::Low,
        1 => Priority::Normal,
        2 => Priority::High,
        _ => Priority::Critical,
    }
}

fn millis_since_epoch(t: SystemTime) -> u128 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

fn system_time_from_millis(millis: u128) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis.min(u64::MAX as u128) as u64)
}

/// Byte-wise XOR of `data` against a repeating `key`. This is the
/// "obfuscation" §9 calls out by name: it is not encryption and makes no
/// confidentiality claim, matching the spec's explicit labeling.
fn xor_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return data.to_vec();
    }
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

/// Encodes a [`CacheEntry`] to the bytes written at `<hash(key)>.cache`,
/// applying obfuscation to `data` and then GZIP to the whole envelope, in
/// that order, matching §4.3.
pub fn encode_envelope(entry: &CacheEntry, obfuscation_key: Option<&str>) -> Vec<u8> {
    let raw_data = if entry.obfuscated {
        let key = obfuscation_key.unwrap_or_default().as_bytes();
        xor_with_key(&entry.payload, key)
    } else {
        entry.payload.clone()
    };

    let envelope = DiskEnvelope {
        key: entry.key.clone(),
        data: BASE64.encode(raw_data),
        expires_at_ms: millis_since_epoch(entry.expires_at),
        priority_ordinal: priority_ordinal(entry.priority),
        size: entry.size(),
        access_count: entry.access_count,
        last_accessed_at_ms: millis_since_epoch(entry.last_accessed_at),
        tags: entry.tags.iter().cloned().collect(),
        compressed: entry.compressed,
        obfuscated: entry.obfuscated,
    };

    let json = serde_json::to_vec(&envelope).expect("envelope serialization cannot fail");

    if entry.compressed {
        let mut encoder = GzEncoder::new(json.as_slice(), Compression::default());
        let mut out = Vec::new();
        encoder
            .read_to_end(&mut out)
            .expect("in-memory gzip encode cannot fail");
        out
    } else {
        json
    }
}

/// Decodes bytes previously produced by [`encode_envelope`] back into a
/// [`CacheEntry`]. Sniffs the GZIP magic number rather than trusting a flag
/// from the caller, since a cold read (disk-only, memory tier empty) has no
/// prior knowledge of the entry's `compressed` bit.
///
/// Returns `None` on any structural problem (bad gzip, bad JSON, bad
/// base64) so the caller can treat it as corruption and delete the file
/// (§4.3: "All fields must be validated on read; any failure deletes the
/// file and reports miss").
pub fn decode_envelope(bytes: &[u8], obfuscation_key: Option<&str>) -> Option<CacheEntry> {
    const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
    let looks_gzipped = bytes.len() >= 2 && bytes[0..2] == GZIP_MAGIC;

    let json_bytes = if looks_gzipped {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).ok()?;
        out
    } else {
        bytes.to_vec()
    };

    let envelope: DiskEnvelope = serde_json::from_slice(&json_bytes).ok()?;
    let raw_data = BASE64.decode(envelope.data).ok()?;

    let payload = if envelope.obfuscated {
        let key = obfuscation_key.unwrap_or_default().as_bytes();
        xor_with_key(&raw_data, key)
    } else {
        raw_data
    };

    if payload.len() as u64 != envelope.size {
        return None;
    }

    Some(CacheEntry {
        key: envelope.key,
        payload,
        created_at: system_time_from_millis(envelope.last_accessed_at_ms)
            .min(system_time_from_millis(envelope.expires_at_ms)),
        expires_at: system_time_from_millis(envelope.expires_at_ms),
        priority: priority_from_ordinal(envelope.priority_ordinal),
        access_count: envelope.access_count,
        last_accessed_at: system_time_from_millis(envelope.last_accessed_at_ms),
        tags: envelope.tags.into_iter().collect(),
        compressed: envelope.compressed,
        obfuscated: envelope.obfuscated,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::collection::{hash_set, vec as pvec};
    use proptest::prelude::*;

    fn priority() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::Low),
            Just(Priority::Normal),
            Just(Priority::High),
            Just(Priority::Critical),
        ]
    }

    proptest! {
        /// `decode_envelope(encode_envelope(entry))` preserves payload, tags,
        /// and priority for any payload/tag/flag combination, matching
        /// whichever of the four compress/obfuscate combinations was used to
        /// encode it.
        #[test]
        fn encode_decode_round_trips_for_arbitrary_entries(
            payload in pvec(any::<u8>(), 0..512),
            tags in hash_set("[a-z]{1,8}", 0..5),
            priority in priority(),
            compressed in any::<bool>(),
            obfuscated in any::<bool>(),
            key_seed in "[a-zA-Z0-9]{1,16}",
        ) {
            let entry = CacheEntry::new(
                "round-trip-key",
                payload.clone(),
                Duration::from_secs(60),
                priority,
                tags.clone(),
                compressed,
                obfuscated,
            );
            let obfuscation_key = obfuscated.then_some(key_seed.as_str());

            let bytes = encode_envelope(&entry, obfuscation_key);
            let decoded = decode_envelope(&bytes, obfuscation_key).expect("well-formed envelope always decodes");

            prop_assert_eq!(decoded.payload, payload);
            prop_assert_eq!(decoded.tags, tags);
            prop_assert_eq!(decoded.priority, priority);
        }
    }
}
