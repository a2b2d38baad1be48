//! Default trust store inherited by TLS contexts built without one.
//!
//! [`GlobalTlsDefaults`] is an ordinary object that context builders take by
//! reference, so tests and embedders can keep independent instances. A single
//! process-wide instance is available through [`GlobalTlsDefaults::global`]
//! for code that has no way to thread one through.
//!
//! Lifecycle:
//! - empty until something installs a store;
//! - the first TLS context to resolve its store **seals** the defaults,
//!   installing the library default (Mozilla roots) if nothing else was;
//! - once sealed, every install fails with [`ConfigLockedError`].
//!
//! Installing must therefore happen-before the first context is built.

use std::sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::error::ConfigLockedError;
use crate::store::{StoreOrigin, TrustStore};

static PROCESS_DEFAULTS: LazyLock<Arc<GlobalTlsDefaults>> =
    LazyLock::new(|| Arc::new(GlobalTlsDefaults::new()));

/// Result of a successful install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Nothing was installed before.
    Installed,
    /// An equivalent store was already installed and was kept.
    Unchanged,
    /// A different store was replaced (last write wins).
    Replaced,
}

struct DefaultsState {
    store: Option<Arc<TrustStore>>,
    sealed: bool,
}

/// Holder of the default trust store.
pub struct GlobalTlsDefaults {
    state: RwLock<DefaultsState>,
}

impl GlobalTlsDefaults {
    /// Empty, unsealed defaults.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(DefaultsState {
                store: None,
                sealed: false,
            }),
        }
    }

    /// The process-wide instance.
    pub fn global() -> Arc<GlobalTlsDefaults> {
        Arc::clone(&PROCESS_DEFAULTS)
    }

    /// The installed store, if any.
    pub fn current(&self) -> Option<Arc<TrustStore>> {
        self.read().store.clone()
    }

    /// Whether a TLS context has already resolved its store from here.
    pub fn is_sealed(&self) -> bool {
        self.read().sealed
    }

    /// Replace the default store.
    ///
    /// Equivalent stores leave the existing `Arc` in place.
    pub fn install(
        &self,
        store: impl Into<Arc<TrustStore>>,
    ) -> Result<InstallOutcome, ConfigLockedError> {
        let mut state = self.write();
        install_locked(&mut state, store.into())
    }

    /// Return the installed store, or build and install one.
    ///
    /// The write lock is held across `build`, so concurrent callers run it at
    /// most once and all receive the same `Arc`. A failed build leaves the
    /// defaults untouched.
    pub fn get_or_install_with<E, F>(&self, build: F) -> Result<Arc<TrustStore>, E>
    where
        F: FnOnce() -> Result<TrustStore, E>,
        E: From<ConfigLockedError>,
    {
        let mut state = self.write();
        if let Some(existing) = &state.store {
            if state.sealed && existing.origin() == StoreOrigin::LibraryDefault {
                warn!("a TLS context was created before the default trust store was installed");
                return Err(ConfigLockedError::new(
                    "a TLS context already resolved the library default store",
                )
                .into());
            }
            return Ok(Arc::clone(existing));
        }

        let store = Arc::new(build()?);
        install_locked(&mut state, Arc::clone(&store))?;
        Ok(store)
    }

    /// Seal without resolving a store.
    pub fn seal(&self) {
        self.write().sealed = true;
    }

    /// Store for a TLS context that was not given one explicitly.
    ///
    /// Seals the defaults. Falls back to the library default store when
    /// nothing was installed.
    pub fn resolve_for_context(&self) -> Arc<TrustStore> {
        {
            let state = self.read();
            if state.sealed {
                if let Some(store) = &state.store {
                    return Arc::clone(store);
                }
            }
        }

        let mut state = self.write();
        state.sealed = true;
        match &state.store {
            Some(store) => Arc::clone(store),
            None => {
                let store = Arc::new(TrustStore::library_default());
                info!(
                    anchors = store.len(),
                    fingerprint = %store.short_fingerprint(),
                    "no default trust store installed, using library default"
                );
                state.store = Some(Arc::clone(&store));
                store
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DefaultsState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DefaultsState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for GlobalTlsDefaults {
    fn default() -> Self {
        Self::new()
    }
}

fn install_locked(
    state: &mut DefaultsState,
    store: Arc<TrustStore>,
) -> Result<InstallOutcome, ConfigLockedError> {
    if state.sealed {
        return Err(ConfigLockedError::new(
            "a TLS context has already been built from these defaults",
        ));
    }

    let outcome = match &state.store {
        Some(existing) if existing.is_equivalent(&store) => return Ok(InstallOutcome::Unchanged),
        Some(_) => InstallOutcome::Replaced,
        None => InstallOutcome::Installed,
    };

    info!(
        origin = %store.origin(),
        anchors = store.len(),
        crls = store.crls().len(),
        fingerprint = %store.short_fingerprint(),
        ?outcome,
        "default trust store installed"
    );
    state.store = Some(store);
    Ok(outcome)
}
