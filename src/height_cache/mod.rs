//! Per-item height records with estimation fallback and optional persistence.
//!
//! - [`estimate`] - pure height estimation from role and content
//! - [`entry`] - cache records and content fingerprints
//! - [`store`] - key → JSON snapshot backends
//! - [`cache`] - the [`HeightCache`] itself

pub mod cache;
pub mod entry;
pub mod estimate;
pub mod store;

pub use cache::{CacheStats, HeightCache, HeightCacheConfig};
pub use entry::{is_valid_height, CacheEntry, ContentHash};
pub use estimate::{wrapped_line_count, EstimateConfig, RoleHeights};
pub use store::{FileStore, MemoryStore, SnapshotStore};
