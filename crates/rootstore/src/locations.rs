//! Platform default certificate lookup locations.
//!
//! [`LookupPaths`] mirrors the "default paths" of a system TLS library: one or
//! more CA bundle files plus hashed CA directories. The environment variables
//! `SSL_CERT_FILE` and `SSL_CERT_DIR` override the file and directory halves
//! independently; any half left unset is filled by probing well-known OS
//! locations and keeping the ones that exist.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable naming a single CA bundle file.
pub const CERT_FILE_ENV: &str = "SSL_CERT_FILE";

/// Environment variable naming CA directories, separated like `PATH`.
pub const CERT_DIR_ENV: &str = "SSL_CERT_DIR";

/// Bundle files shipped by common Unix distributions.
#[cfg(unix)]
const CANDIDATE_FILES: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/ca-bundle.pem",
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem",
    "/etc/pki/tls/cacert.pem",
    "/etc/ssl/cert.pem",
    "/usr/local/etc/openssl/cert.pem",
    "/usr/local/share/certs/ca-root-nss.crt",
];

#[cfg(not(unix))]
const CANDIDATE_FILES: &[&str] = &[];

/// Hashed CA directories shipped by common Unix distributions.
#[cfg(unix)]
const CANDIDATE_DIRS: &[&str] = &[
    "/etc/ssl/certs",
    "/etc/pki/tls/certs",
    "/system/etc/security/cacerts",
];

#[cfg(not(unix))]
const CANDIDATE_DIRS: &[&str] = &[];

/// CA bundle files and directories to load trust anchors from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupPaths {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl LookupPaths {
    /// No locations at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve locations from the environment, probing the OS for any half
    /// the environment leaves unset.
    pub fn from_env() -> Self {
        Self::from_env_values(std::env::var_os(CERT_FILE_ENV), std::env::var_os(CERT_DIR_ENV))
    }

    /// [`from_env`](Self::from_env) over explicit variable values. An empty
    /// value counts as unset and is probed.
    pub(crate) fn from_env_values(file: Option<OsString>, dir: Option<OsString>) -> Self {
        let probe_files = file.as_ref().map_or(true, |f| f.is_empty());
        let probe_dirs = dir.as_ref().map_or(true, |d| d.is_empty());

        let mut paths = Self::from_vars(file, dir);
        if probe_files {
            paths.files = existing(CANDIDATE_FILES.iter().map(Path::new), Path::is_file);
        }
        if probe_dirs {
            paths.dirs = existing(CANDIDATE_DIRS.iter().map(Path::new), Path::is_dir);
        }
        paths
    }

    /// Build locations from raw `SSL_CERT_FILE` / `SSL_CERT_DIR` values only.
    ///
    /// Empty values are treated as unset. The directory value is split with
    /// the platform path-list separator.
    pub fn from_vars(file: Option<OsString>, dir: Option<OsString>) -> Self {
        let files = file
            .filter(|f| !f.is_empty())
            .map(|f| vec![PathBuf::from(f)])
            .unwrap_or_default();
        let dirs = dir
            .filter(|d| !d.is_empty())
            .map(|d| {
                std::env::split_paths(&d)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self { files, dirs }
    }

    /// Probe an arbitrary candidate list, keeping entries that exist.
    pub fn probe<'a>(
        files: impl IntoIterator<Item = &'a Path>,
        dirs: impl IntoIterator<Item = &'a Path>,
    ) -> Self {
        Self {
            files: existing(files, Path::is_file),
            dirs: existing(dirs, Path::is_dir),
        }
    }

    /// Add a bundle file.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Add a CA directory.
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dirs.push(path.into());
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Total number of file and directory locations.
    pub fn len(&self) -> usize {
        self.files.len() + self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Append `other`'s locations, skipping ones already present.
    pub(crate) fn merge(&mut self, other: &LookupPaths) {
        for f in &other.files {
            if !self.files.contains(f) {
                self.files.push(f.clone());
            }
        }
        for d in &other.dirs {
            if !self.dirs.contains(d) {
                self.dirs.push(d.clone());
            }
        }
    }
}

fn existing<'a>(
    candidates: impl IntoIterator<Item = &'a Path>,
    keep: impl Fn(&Path) -> bool,
) -> Vec<PathBuf> {
    candidates
        .into_iter()
        .filter(|p| keep(*p))
        .map(Path::to_path_buf)
        .collect()
}
