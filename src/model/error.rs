//! Error types for streamlist.
//!
//! The engine itself is total: no engine operation returns an error. The types
//! here describe failures at the edges, where they are either logged and
//! absorbed (persistence) or reported by the binary (startup).
//!
//! # Error Hierarchy
//!
//! - [`StoreError`] - snapshot store failures (I/O, JSON, bad keys). Always
//!   absorbed by the height cache: logged once, then the cache continues
//!   in memory only.
//! - [`AppError`] - top-level binary error wrapping config, logging, input
//!   and terminal failures.

use crate::config::ConfigError;
use crate::logging::LoggingError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a [`SnapshotStore`](crate::height_cache::SnapshotStore).
///
/// None of these are fatal: the height cache is always reconstructable from
/// fresh measurements, so callers log and degrade to in-memory operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Snapshot store I/O failed at {path:?}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Stored value was not valid JSON, or a value could not be encoded.
    #[error("Snapshot store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key cannot be mapped onto the backing store.
    #[error("Invalid snapshot store key: {0:?}")]
    InvalidKey(String),

    /// Store refused the operation (quota exceeded, store unavailable).
    #[error("Snapshot store unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error for the `streamlist` binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration file exists but could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tracing subscriber could not be installed.
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    /// Transcript file could not be opened.
    #[error("Failed to read transcript {path:?}: {source}")]
    Input {
        /// Transcript path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Terminal or rendering failure.
    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}
