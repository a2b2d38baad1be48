//! Immutable trust-anchor sets.
//!
//! A [`TrustStore`] is assembled once through a [`TrustStoreBuilder`] and then
//! shared as `Arc<TrustStore>`. Nothing can add or remove anchors after
//! `build()`, so a TLS context that captured a store keeps seeing exactly the
//! anchors it was built with.
//!
//! Anchors are de-duplicated by the SHA-256 of their DER encoding. Debian-style
//! systems ship the same roots both as a bundle and as a hashed directory, so
//! loading both locations is common.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, CertificateRevocationListDer};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::StoreInitError;
use crate::locations::LookupPaths;

/// Where a store's anchors came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOrigin {
    /// Bundle files and CA directories on the local filesystem.
    Platform,
    /// The operating system certificate store, via `rustls-native-certs`.
    Native,
    /// Compiled-in Mozilla roots. Used when nothing was installed.
    LibraryDefault,
    /// Anchors supplied directly by the caller.
    Explicit,
}

impl fmt::Display for StoreOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOrigin::Platform => "platform",
            StoreOrigin::Native => "native",
            StoreOrigin::LibraryDefault => "library-default",
            StoreOrigin::Explicit => "explicit",
        };
        f.write_str(name)
    }
}

/// An immutable set of trust anchors plus the locations they were read from.
pub struct TrustStore {
    roots: Arc<RootCertStore>,
    crls: Vec<CertificateRevocationListDer<'static>>,
    locations: LookupPaths,
    origin: StoreOrigin,
    fingerprint: [u8; 32],
}

impl TrustStore {
    /// Start from an empty store.
    pub fn builder() -> TrustStoreBuilder {
        TrustStoreBuilder::new()
    }

    /// The Mozilla root program bundled through `webpki-roots`.
    pub fn library_default() -> Self {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        Self::assemble(roots, Vec::new(), LookupPaths::empty(), StoreOrigin::LibraryDefault)
    }

    fn assemble(
        roots: RootCertStore,
        crls: Vec<CertificateRevocationListDer<'static>>,
        locations: LookupPaths,
        origin: StoreOrigin,
    ) -> Self {
        let fingerprint = fingerprint(&roots, &crls);
        Self {
            roots: Arc::new(roots),
            crls,
            locations,
            origin,
            fingerprint,
        }
    }

    /// Shared handle to the rustls root store.
    pub fn root_store(&self) -> Arc<RootCertStore> {
        Arc::clone(&self.roots)
    }

    /// Revocation lists consulted by verifiers built over this store.
    pub fn crls(&self) -> &[CertificateRevocationListDer<'static>] {
        &self.crls
    }

    pub fn locations(&self) -> &LookupPaths {
        &self.locations
    }

    pub fn origin(&self) -> StoreOrigin {
        self.origin
    }

    /// Number of trust anchors.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// SHA-256 over the anchor set and CRLs, in insertion order.
    pub fn fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }

    /// First 8 fingerprint bytes as lowercase hex, for logs.
    pub fn short_fingerprint(&self) -> String {
        self.fingerprint[..8].iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Two stores are equivalent when they hold the same anchors and CRLs.
    pub fn is_equivalent(&self, other: &TrustStore) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl PartialEq for TrustStore {
    fn eq(&self, other: &Self) -> bool {
        self.is_equivalent(other)
    }
}

impl Eq for TrustStore {}

impl fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustStore")
            .field("origin", &self.origin)
            .field("anchors", &self.roots.len())
            .field("crls", &self.crls.len())
            .field("fingerprint", &self.short_fingerprint())
            .finish()
    }
}

fn fingerprint(roots: &RootCertStore, crls: &[CertificateRevocationListDer<'_>]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for anchor in &roots.roots {
        hash_field(&mut hasher, anchor.subject.as_ref());
        hash_field(&mut hasher, anchor.subject_public_key_info.as_ref());
        match &anchor.name_constraints {
            Some(nc) => hash_field(&mut hasher, nc.as_ref()),
            None => hash_field(&mut hasher, &[]),
        }
    }
    hasher.update(b"crls");
    for crl in crls {
        hash_field(&mut hasher, crl.as_ref());
    }
    hasher.finalize().into()
}

fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Accumulates anchors into a new, initially empty store.
pub struct TrustStoreBuilder {
    roots: RootCertStore,
    seen: HashSet<[u8; 32]>,
    crls: Vec<CertificateRevocationListDer<'static>>,
    locations: LookupPaths,
    origin: StoreOrigin,
    rejected: usize,
}

impl TrustStoreBuilder {
    fn new() -> Self {
        Self {
            roots: RootCertStore::empty(),
            seen: HashSet::new(),
            crls: Vec::new(),
            locations: LookupPaths::empty(),
            origin: StoreOrigin::Explicit,
            rejected: 0,
        }
    }

    /// Load every bundle file and CA directory in `paths`.
    ///
    /// Returns the number of anchors added. A location that cannot be read is
    /// a hard error: silently skipping it would shrink the trust set.
    pub fn set_default_paths(&mut self, paths: &LookupPaths) -> Result<usize, StoreInitError> {
        let mut added = 0;
        for file in paths.files() {
            added += self.add_pem_file(file)?;
        }
        for dir in paths.dirs() {
            added += self.add_pem_dir(dir)?;
        }
        self.locations.merge(paths);
        self.origin = StoreOrigin::Platform;
        Ok(added)
    }

    /// Load all certificates from one PEM bundle.
    pub fn add_pem_file(&mut self, path: impl AsRef<Path>) -> Result<usize, StoreInitError> {
        let path = path.as_ref();
        let bytes = read(path)?;
        let certs = parse_certs(path, &bytes)?;
        let added = certs.into_iter().filter(|c| self.add_der(c.clone())).count();
        debug!(path = %path.display(), added, "loaded CA bundle");
        Ok(added)
    }

    /// Load every PEM file in a CA directory.
    ///
    /// Entries that are not regular files or hold no parseable PEM are
    /// skipped; hashed CA directories routinely carry unrelated files.
    pub fn add_pem_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, StoreInitError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| StoreInitError::Read {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreInitError::Read {
                path: dir.to_path_buf(),
                source,
            })?;
            paths.push(entry.path());
        }
        paths.sort();

        let mut added = 0;
        for path in paths.iter().filter(|p| p.is_file()) {
            let bytes = match std::fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            match parse_certs(path, &bytes) {
                Ok(certs) => {
                    added += certs.into_iter().filter(|c| self.add_der(c.clone())).count();
                }
                Err(e) => debug!(error = %e, "skipping non-PEM entry"),
            }
        }
        debug!(dir = %dir.display(), added, "loaded CA directory");
        Ok(added)
    }

    /// Load the operating system certificate store.
    ///
    /// Loader errors are logged and tolerated as long as some certificates
    /// were returned. Errors with no certificates at all fail.
    pub fn add_native_certs(&mut self) -> Result<usize, StoreInitError> {
        let result = rustls_native_certs::load_native_certs();
        self.add_native_result(result.certs, &result.errors)
    }

    fn add_native_result(
        &mut self,
        certs: Vec<CertificateDer<'static>>,
        errors: &[impl fmt::Display],
    ) -> Result<usize, StoreInitError> {
        for e in errors {
            warn!(error = %e, "native certificate store reported an error");
        }
        if certs.is_empty() {
            if let Some(first) = errors.first() {
                return Err(StoreInitError::Native {
                    count: errors.len(),
                    first: first.to_string(),
                });
            }
        }
        let added = certs.into_iter().filter(|c| self.add_der(c.clone())).count();
        self.origin = StoreOrigin::Native;
        info!(added, "loaded native certificate store");
        Ok(added)
    }

    /// Add one DER certificate as an anchor.
    ///
    /// Returns `false` for duplicates and for certificates rustls cannot use
    /// as a trust anchor.
    pub fn add_der(&mut self, der: CertificateDer<'static>) -> bool {
        let digest: [u8; 32] = Sha256::digest(der.as_ref()).into();
        if self.seen.contains(&digest) {
            return false;
        }
        match self.roots.add(der) {
            Ok(()) => {
                self.seen.insert(digest);
                true
            }
            Err(e) => {
                self.rejected += 1;
                debug!(error = %e, "ignoring unusable trust anchor");
                false
            }
        }
    }

    /// Attach every CRL found in a PEM file.
    pub fn add_crl_pem_file(&mut self, path: impl AsRef<Path>) -> Result<usize, StoreInitError> {
        let path = path.as_ref();
        let bytes = read(path)?;
        let mut added = 0;
        for item in CertificateRevocationListDer::pem_slice_iter(&bytes) {
            let crl = item.map_err(|e| StoreInitError::Pem {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            self.crls.push(crl);
            added += 1;
        }
        debug!(path = %path.display(), added, "loaded CRLs");
        Ok(added)
    }

    /// Attach one DER-encoded CRL.
    pub fn add_crl_der(&mut self, crl: CertificateRevocationListDer<'static>) {
        self.crls.push(crl);
    }

    /// Anchors accepted so far.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Freeze the store. Fails when no anchor was loaded.
    pub fn build(self) -> Result<TrustStore, StoreInitError> {
        if self.roots.is_empty() {
            return Err(StoreInitError::NoAnchors {
                searched: self.locations.len(),
            });
        }
        if self.rejected > 0 {
            warn!(rejected = self.rejected, "some certificates were not usable as trust anchors");
        }
        Ok(TrustStore::assemble(
            self.roots,
            self.crls,
            self.locations,
            self.origin,
        ))
    }
}

fn read(path: &Path) -> Result<Vec<u8>, StoreInitError> {
    std::fs::read(path).map_err(|source| StoreInitError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_certs(path: &Path, bytes: &[u8]) -> Result<Vec<CertificateDer<'static>>, StoreInitError> {
    CertificateDer::pem_slice_iter(bytes)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreInitError::Pem {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}
