//! WebPKI verifiers over a [`TrustStore`].
//!
//! Chain building and CRL evaluation stay inside rustls/webpki. This module
//! only decides which anchors, CRLs and revocation options they are given.
//!
//! Revocation is checked only when the store carries CRLs. By default just
//! the end-entity certificate is checked and an unknown status (no CRL from
//! the issuer) is accepted, so a store with a partial CRL set does not break
//! every handshake.

use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::server::danger::ClientCertVerifier;
use rustls::server::WebPkiClientVerifier;

use crate::error::{Result, TrustError};
use crate::store::TrustStore;

/// Which certificates in a chain are checked against CRLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevocationDepth {
    #[default]
    EndEntity,
    FullChain,
}

/// What to do when no CRL covers a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownStatus {
    #[default]
    Allow,
    Deny,
}

/// CRL evaluation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RevocationPolicy {
    pub depth: RevocationDepth,
    pub unknown_status: UnknownStatus,
}

impl RevocationPolicy {
    /// Every certificate in the chain must be covered and unrevoked.
    pub fn strict() -> Self {
        Self {
            depth: RevocationDepth::FullChain,
            unknown_status: UnknownStatus::Deny,
        }
    }
}

/// Verifier for server certificates presented to a client.
pub fn server_verifier(
    store: &TrustStore,
    policy: RevocationPolicy,
    provider: Arc<CryptoProvider>,
) -> Result<Arc<WebPkiServerVerifier>> {
    let mut builder = WebPkiServerVerifier::builder_with_provider(store.root_store(), provider)
        .with_crls(store.crls().iter().cloned());
    if !store.crls().is_empty() {
        if policy.depth == RevocationDepth::EndEntity {
            builder = builder.only_check_end_entity_revocation();
        }
        if policy.unknown_status == UnknownStatus::Allow {
            builder = builder.allow_unknown_revocation_status();
        }
    }
    builder
        .build()
        .map_err(|e| TrustError::TlsConfiguration(format!("server verifier: {e}")))
}

/// Verifier for client certificates presented to a server.
///
/// `mandatory = false` lets clients without a certificate through; a
/// certificate that is presented is still verified.
pub fn client_verifier(
    store: &TrustStore,
    policy: RevocationPolicy,
    mandatory: bool,
    provider: Arc<CryptoProvider>,
) -> Result<Arc<dyn ClientCertVerifier>> {
    let mut builder = WebPkiClientVerifier::builder_with_provider(store.root_store(), provider)
        .with_crls(store.crls().iter().cloned());
    if !store.crls().is_empty() {
        if policy.depth == RevocationDepth::EndEntity {
            builder = builder.only_check_end_entity_revocation();
        }
        if policy.unknown_status == UnknownStatus::Allow {
            builder = builder.allow_unknown_revocation_status();
        }
    }
    if !mandatory {
        builder = builder.allow_unauthenticated();
    }
    builder
        .build()
        .map_err(|e| TrustError::TlsConfiguration(format!("client verifier: {e}")))
}
