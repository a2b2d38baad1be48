//! Trust-store resolution for rustls contexts.
//!
//! Shared layer used by `rootstore-client` and `rootstore-server`:
//!
//! - Platform CA lookup locations (`SSL_CERT_FILE`, `SSL_CERT_DIR`, OS probing)
//! - Immutable trust stores with optional CRLs
//! - Process-wide default store, sealed once the first TLS context is built
//! - Client/server TLS context builders over the resolved store

pub mod defaults;
pub mod error;
pub mod locations;
pub mod resolver;
pub mod store;
pub mod tls;

#[cfg(test)]
mod testutil;

pub use defaults::{GlobalTlsDefaults, InstallOutcome};
pub use error::{ConfigLockedError, Result, StoreInitError, TrustError};
pub use locations::LookupPaths;
pub use resolver::{ensure_default_trust_store, ResolverConfig, TrustStoreResolver};
pub use store::{StoreOrigin, TrustStore, TrustStoreBuilder};

/// ALPN identifier used by the QUIC endpoints.
pub const ALPN_ROOTSTORE: &[u8] = b"rootstore";
