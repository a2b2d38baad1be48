//! Error types for trust-store resolution and TLS context construction.
//!
//! Two failures are fatal at startup and must stop the process before any
//! TLS connection is attempted:
//!
//! - [`StoreInitError`]: no usable platform trust anchors.
//! - [`ConfigLockedError`]: the default-store slot can no longer be written.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur within the `rootstore` crate.
#[derive(Debug, Error)]
pub enum TrustError {
    // --- Trust store ---
    #[error("trust store initialization failed: {0}")]
    StoreInit(#[from] StoreInitError),

    #[error(transparent)]
    ConfigLocked(#[from] ConfigLockedError),

    // --- TLS ---
    #[error("TLS configuration error: {0}")]
    TlsConfiguration(String),

    #[error("failed to load TLS identity: {0}")]
    Identity(String),
}

/// Platform trust anchors could not be loaded.
#[derive(Debug, Error)]
pub enum StoreInitError {
    #[error("no platform certificate locations were found")]
    NoLocations,

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed PEM in {}: {reason}", path.display())]
    Pem { path: PathBuf, reason: String },

    #[error("native certificate store unavailable ({count} error(s)): {first}")]
    Native { count: usize, first: String },

    #[error("no usable trust anchors found (searched {searched} location(s))")]
    NoAnchors { searched: usize },
}

/// The default-store slot is sealed and rejects further installs.
#[derive(Debug, Clone, Error)]
#[error("global TLS defaults are locked: {reason}")]
pub struct ConfigLockedError {
    reason: &'static str,
}

impl ConfigLockedError {
    pub(crate) fn new(reason: &'static str) -> Self {
        Self { reason }
    }

    /// Why the slot was sealed.
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

/// Result type alias using [`TrustError`].
pub type Result<T> = std::result::Result<T, TrustError>;
