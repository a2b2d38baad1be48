//! Building the platform trust store and installing it as the default.
//!
//! Typical startup:
//!
//! ```no_run
//! fn main() -> rootstore::Result<()> {
//!     let store = rootstore::ensure_default_trust_store()?;
//!     tracing::info!(anchors = store.len(), "trust store ready");
//!     // ... build TLS contexts, open connections ...
//!     Ok(())
//! }
//! ```
//!
//! Any error here is fatal. Continuing without trust anchors would silently
//! downgrade every later connection.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error};

use crate::defaults::{GlobalTlsDefaults, InstallOutcome};
use crate::error::{ConfigLockedError, Result, StoreInitError, TrustError};
use crate::locations::LookupPaths;
use crate::store::TrustStore;

/// Where the resolver looks for anchors.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    locations: LookupPaths,
    native_fallback: bool,
    crl_files: Vec<PathBuf>,
}

impl ResolverConfig {
    /// `SSL_CERT_FILE` / `SSL_CERT_DIR`, else probed OS locations, with the
    /// native store as fallback.
    pub fn from_env() -> Self {
        Self {
            locations: LookupPaths::from_env(),
            native_fallback: true,
            crl_files: Vec::new(),
        }
    }

    /// Exactly the given locations and nothing else.
    pub fn with_locations(locations: LookupPaths) -> Self {
        Self {
            locations,
            native_fallback: false,
            crl_files: Vec::new(),
        }
    }

    /// Load the OS certificate store when no file or directory location
    /// was found.
    pub fn native_fallback(mut self, enabled: bool) -> Self {
        self.native_fallback = enabled;
        self
    }

    /// Attach CRLs from a PEM file to the built store.
    pub fn crl_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.crl_files.push(path.into());
        self
    }

    pub fn locations(&self) -> &LookupPaths {
        &self.locations
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Builds the platform trust store and installs it into a
/// [`GlobalTlsDefaults`].
pub struct TrustStoreResolver {
    config: ResolverConfig,
    defaults: Arc<GlobalTlsDefaults>,
}

impl TrustStoreResolver {
    pub fn new(config: ResolverConfig, defaults: Arc<GlobalTlsDefaults>) -> Self {
        Self { config, defaults }
    }

    /// Resolver over the environment and the process-wide defaults.
    pub fn from_env() -> Self {
        Self::new(ResolverConfig::from_env(), GlobalTlsDefaults::global())
    }

    pub fn defaults(&self) -> &Arc<GlobalTlsDefaults> {
        &self.defaults
    }

    /// Build a new store from the platform default locations.
    ///
    /// Does not touch the defaults.
    pub fn build_default_store(&self) -> std::result::Result<TrustStore, StoreInitError> {
        let locations = &self.config.locations;
        let mut builder = TrustStore::builder();

        if !locations.is_empty() {
            let added = builder.set_default_paths(locations)?;
            debug!(
                files = locations.files().len(),
                dirs = locations.dirs().len(),
                added,
                "loaded platform default locations"
            );
        } else if self.config.native_fallback {
            builder.add_native_certs()?;
            if builder.is_empty() {
                return Err(StoreInitError::NoLocations);
            }
        } else {
            return Err(StoreInitError::NoLocations);
        }

        for path in &self.config.crl_files {
            builder.add_crl_pem_file(path)?;
        }

        builder.build()
    }

    /// Make `store` the default for contexts built without one.
    pub fn install_as_default(
        &self,
        store: impl Into<Arc<TrustStore>>,
    ) -> std::result::Result<InstallOutcome, ConfigLockedError> {
        self.defaults.install(store)
    }

    /// Build and install the platform store exactly once.
    ///
    /// Concurrent callers share a single build. Later callers get the
    /// already-installed store, whatever installed it.
    pub fn ensure_default_trust_store(&self) -> Result<Arc<TrustStore>> {
        self.defaults
            .get_or_install_with(|| self.build_default_store().map_err(TrustError::from))
            .inspect_err(|e| error!(error = %e, "default trust store unavailable"))
    }
}

/// Install the platform trust store as the process-wide default.
///
/// Call once during startup, before building any TLS context.
pub fn ensure_default_trust_store() -> Result<Arc<TrustStore>> {
    TrustStoreResolver::from_env().ensure_default_trust_store()
}
