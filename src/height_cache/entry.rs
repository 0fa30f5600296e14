//! Cache records and content fingerprints.

use crate::model::ItemId;
use chrono::{DateTime, Utc};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::time::Duration;

/// Cheap fingerprint of an item's content.
///
/// Two contents with equal hashes are treated as producing the same height.
/// FxHash is deterministic across runs, so hashes stay comparable after a
/// snapshot round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(u64);

impl ContentHash {
    /// Fingerprint `content`.
    pub fn of(content: &str) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(content.as_bytes());
        hasher.write_usize(content.len());
        Self(hasher.finish())
    }

    /// Raw hash value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Returns true if `height` can be stored: finite and strictly positive.
pub fn is_valid_height(height: f64) -> bool {
    height.is_finite() && height > 0.0
}

/// One measured item height.
///
/// Serialized as a snapshot record:
/// `{"id": "...", "height": 132.0, "timestamp": 1735120800000, "contentHash": 123}`.
///
/// # Invariants
/// - `height` is finite and positive
/// - valid for lookups only while `content_hash` matches the item's current content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Item the height belongs to.
    pub id: ItemId,
    /// Measured height.
    pub height: f64,
    /// Last write time (epoch milliseconds on the wire).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Fingerprint of the content that was measured.
    pub content_hash: ContentHash,
}

impl CacheEntry {
    /// Create a cache entry.
    pub fn new(
        id: ItemId,
        height: f64,
        content_hash: ContentHash,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            height,
            timestamp,
            content_hash,
        }
    }

    /// Whether this entry still describes content with hash `hash`.
    pub fn matches(&self, hash: ContentHash) -> bool {
        self.content_hash == hash
    }

    /// Whether the entry is older than `ttl` at time `now`.
    ///
    /// Entries stamped in the future (clock skew) are never expired.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.timestamp).to_std() {
            Ok(age) => age > ttl,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn id(s: &str) -> ItemId {
        ItemId::new(s).expect("valid id")
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(ContentHash::of("hello"), ContentHash::of("hello"));
    }

    #[test]
    fn content_hash_differs_for_different_content() {
        assert_ne!(ContentHash::of("hello"), ContentHash::of("hello!"));
        assert_ne!(ContentHash::of(""), ContentHash::of(" "));
    }

    #[test]
    fn valid_height_rejects_non_positive_and_non_finite() {
        assert!(is_valid_height(1.0));
        assert!(is_valid_height(0.5));
        assert!(!is_valid_height(0.0));
        assert!(!is_valid_height(-3.0));
        assert!(!is_valid_height(f64::NAN));
        assert!(!is_valid_height(f64::INFINITY));
    }

    #[test]
    fn entry_serializes_with_camel_case_and_millis() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry::new(id("m1"), 120.0, ContentHash::of("x"), ts);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["id"], "m1");
        assert_eq!(json["height"], 120.0);
        assert_eq!(json["timestamp"], ts.timestamp_millis());
        assert_eq!(json["contentHash"], ContentHash::of("x").get());
    }

    #[test]
    fn entry_round_trips_through_json() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let entry = CacheEntry::new(id("m1"), 64.5, ContentHash::of("abc"), ts);
        let text = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&text).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn matches_compares_content_hash() {
        let entry = CacheEntry::new(id("m1"), 10.0, ContentHash::of("a"), Utc::now());
        assert!(entry.matches(ContentHash::of("a")));
        assert!(!entry.matches(ContentHash::of("b")));
    }

    #[test]
    fn is_expired_respects_ttl() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let old = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry::new(id("m1"), 10.0, ContentHash::of("a"), old);

        assert!(entry.is_expired(now, Duration::from_secs(24 * 3600)));
        assert!(!entry.is_expired(now, Duration::from_secs(30 * 24 * 3600)));
    }

    #[test]
    fn future_timestamp_is_not_expired() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let future = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry::new(id("m1"), 10.0, ContentHash::of("a"), future);
        assert!(!entry.is_expired(now, Duration::from_secs(1)));
    }
}
