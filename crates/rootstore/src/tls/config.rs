//! TLS context builders for client and server endpoints.
//!
//! A context built without an explicit trust store takes the default from a
//! [`GlobalTlsDefaults`] and seals it. Both builders enforce:
//! - Ring crypto provider
//! - WebPKI chain verification over the resolved [`TrustStore`]
//! - CRLs from the store, evaluated per [`RevocationPolicy`]

use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::SupportedProtocolVersion;
use tracing::debug;

use crate::defaults::GlobalTlsDefaults;
use crate::error::{Result, TrustError};
use crate::store::TrustStore;
use crate::tls::identity::TlsIdentity;
use crate::tls::verifier::{client_verifier, server_verifier, RevocationPolicy};

fn ring_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Pick the explicit store, or resolve (and seal) the defaults.
fn resolve_store(
    explicit: Option<Arc<TrustStore>>,
    defaults: &GlobalTlsDefaults,
) -> Arc<TrustStore> {
    match explicit {
        Some(store) => store,
        None => defaults.resolve_for_context(),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A client TLS configuration together with the store it verifies against.
#[derive(Debug, Clone)]
pub struct ClientContext {
    config: Arc<rustls::ClientConfig>,
    trust_store: Arc<TrustStore>,
}

impl ClientContext {
    pub fn builder() -> ClientContextBuilder {
        ClientContextBuilder::default()
    }

    pub fn config(&self) -> Arc<rustls::ClientConfig> {
        Arc::clone(&self.config)
    }

    /// The store this context resolved at build time.
    pub fn trust_store(&self) -> &Arc<TrustStore> {
        &self.trust_store
    }
}

/// Options for a [`ClientContext`].
#[derive(Debug, Default)]
pub struct ClientContextBuilder {
    trust_store: Option<Arc<TrustStore>>,
    identity: Option<TlsIdentity>,
    alpn: Vec<Vec<u8>>,
    versions: Option<Vec<&'static SupportedProtocolVersion>>,
    revocation: RevocationPolicy,
}

impl ClientContextBuilder {
    /// Verify servers against `store` instead of the defaults.
    pub fn trust_store(mut self, store: Arc<TrustStore>) -> Self {
        self.trust_store = Some(store);
        self
    }

    /// Present a client certificate.
    pub fn client_identity(mut self, identity: TlsIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn alpn_protocols(mut self, protocols: Vec<Vec<u8>>) -> Self {
        self.alpn = protocols;
        self
    }

    /// Restrict protocol versions. Defaults to rustls' defaults.
    pub fn protocol_versions(mut self, versions: &[&'static SupportedProtocolVersion]) -> Self {
        self.versions = Some(versions.to_vec());
        self
    }

    pub fn revocation(mut self, policy: RevocationPolicy) -> Self {
        self.revocation = policy;
        self
    }

    /// Build against the process-wide defaults.
    pub fn build(self) -> Result<ClientContext> {
        self.build_with(&GlobalTlsDefaults::global())
    }

    /// Build against the given defaults.
    pub fn build_with(self, defaults: &GlobalTlsDefaults) -> Result<ClientContext> {
        let trust_store = resolve_store(self.trust_store, defaults);
        let provider = ring_provider();
        let verifier = server_verifier(&trust_store, self.revocation, Arc::clone(&provider))?;
        let versions = self
            .versions
            .unwrap_or_else(|| rustls::DEFAULT_VERSIONS.to_vec());

        let builder = rustls::ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(&versions)
            .map_err(|e| TrustError::TlsConfiguration(format!("TLS version config: {e}")))?
            .with_webpki_verifier(verifier);

        let mut config = match self.identity {
            Some(identity) => {
                let (chain, key) = identity.into_parts();
                builder
                    .with_client_auth_cert(chain, key)
                    .map_err(|e| TrustError::TlsConfiguration(format!("client cert config: {e}")))?
            }
            None => builder.with_no_client_auth(),
        };
        config.alpn_protocols = self.alpn;

        debug!(
            origin = %trust_store.origin(),
            fingerprint = %trust_store.short_fingerprint(),
            "client TLS context built"
        );

        Ok(ClientContext {
            config: Arc::new(config),
            trust_store,
        })
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Whether a server asks for client certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientAuth {
    #[default]
    None,
    /// Verify a certificate when one is presented.
    Optional,
    Required,
}

/// A server TLS configuration plus the store used for client certificates.
#[derive(Debug, Clone)]
pub struct ServerContext {
    config: Arc<rustls::ServerConfig>,
    trust_store: Option<Arc<TrustStore>>,
}

impl ServerContext {
    pub fn builder(identity: TlsIdentity) -> ServerContextBuilder {
        ServerContextBuilder {
            identity,
            client_auth: ClientAuth::None,
            trust_store: None,
            alpn: Vec::new(),
            versions: None,
            revocation: RevocationPolicy::default(),
        }
    }

    pub fn config(&self) -> Arc<rustls::ServerConfig> {
        Arc::clone(&self.config)
    }

    /// The store client certificates are checked against. `None` when client
    /// auth is disabled.
    pub fn trust_store(&self) -> Option<&Arc<TrustStore>> {
        self.trust_store.as_ref()
    }
}

/// Options for a [`ServerContext`].
#[derive(Debug)]
pub struct ServerContextBuilder {
    identity: TlsIdentity,
    client_auth: ClientAuth,
    trust_store: Option<Arc<TrustStore>>,
    alpn: Vec<Vec<u8>>,
    versions: Option<Vec<&'static SupportedProtocolVersion>>,
    revocation: RevocationPolicy,
}

impl ServerContextBuilder {
    pub fn client_auth(mut self, mode: ClientAuth) -> Self {
        self.client_auth = mode;
        self
    }

    /// Verify clients against `store` instead of the defaults.
    pub fn trust_store(mut self, store: Arc<TrustStore>) -> Self {
        self.trust_store = Some(store);
        self
    }

    pub fn alpn_protocols(mut self, protocols: Vec<Vec<u8>>) -> Self {
        self.alpn = protocols;
        self
    }

    pub fn protocol_versions(mut self, versions: &[&'static SupportedProtocolVersion]) -> Self {
        self.versions = Some(versions.to_vec());
        self
    }

    pub fn revocation(mut self, policy: RevocationPolicy) -> Self {
        self.revocation = policy;
        self
    }

    /// Build against the process-wide defaults.
    pub fn build(self) -> Result<ServerContext> {
        self.build_with(&GlobalTlsDefaults::global())
    }

    /// Build against the given defaults. The defaults are consulted (and
    /// sealed) only when client auth is enabled and no store was given.
    pub fn build_with(self, defaults: &GlobalTlsDefaults) -> Result<ServerContext> {
        let provider = ring_provider();
        let versions = self
            .versions
            .unwrap_or_else(|| rustls::DEFAULT_VERSIONS.to_vec());

        let builder = rustls::ServerConfig::builder_with_provider(Arc::clone(&provider))
            .with_protocol_versions(&versions)
            .map_err(|e| TrustError::TlsConfiguration(format!("TLS version config: {e}")))?;

        let (builder, trust_store) = match self.client_auth {
            ClientAuth::None => (builder.with_no_client_auth(), None),
            mode => {
                let store = resolve_store(self.trust_store, defaults);
                let verifier = client_verifier(
                    &store,
                    self.revocation,
                    mode == ClientAuth::Required,
                    provider,
                )?;
                (builder.with_client_cert_verifier(verifier), Some(store))
            }
        };

        let (chain, key) = self.identity.into_parts();
        let mut config = builder
            .with_single_cert(chain, key)
            .map_err(|e| TrustError::TlsConfiguration(format!("server cert config: {e}")))?;
        config.alpn_protocols = self.alpn;

        debug!(client_auth = ?self.client_auth, "server TLS context built");

        Ok(ServerContext {
            config: Arc::new(config),
            trust_store,
        })
    }
}

#[cfg(test)]
mod tests {
    use rustls::pki_types::ServerName;
    use rustls::{CertificateError, ClientConnection, ServerConnection};

    use super::*;
    use crate::store::StoreOrigin;
    use crate::testutil::TestCa;

    /// Drive an in-memory handshake to completion or the first error.
    fn handshake(client: &ClientContext, server: &ServerContext) -> std::result::Result<(), rustls::Error> {
        let name = ServerName::try_from("localhost").unwrap();
        let mut c = ClientConnection::new(client.config(), name)?;
        let mut s = ServerConnection::new(server.config())?;

        for _ in 0..16 {
            let mut buf = Vec::new();
            c.write_tls(&mut buf).unwrap();
            let mut rd = &buf[..];
            while !rd.is_empty() {
                s.read_tls(&mut rd).unwrap();
                s.process_new_packets()?;
            }

            let mut buf = Vec::new();
            s.write_tls(&mut buf).unwrap();
            let mut rd = &buf[..];
            while !rd.is_empty() {
                c.read_tls(&mut rd).unwrap();
                c.process_new_packets()?;
            }

            if !c.is_handshaking() && !s.is_handshaking() {
                return Ok(());
            }
        }
        panic!("handshake did not converge");
    }

    fn server_for(ca: &TestCa) -> ServerContext {
        ServerContext::builder(ca.issue("localhost", 10))
            .build_with(&GlobalTlsDefaults::new())
            .unwrap()
    }

    #[test]
    fn client_inherits_installed_default() {
        let defaults = GlobalTlsDefaults::new();
        let ca = TestCa::new("inherit");
        defaults.install(ca.store()).unwrap();

        let ctx = ClientContext::builder().build_with(&defaults).unwrap();

        assert_eq!(**ctx.trust_store(), ca.store());
        assert!(Arc::ptr_eq(ctx.trust_store(), &defaults.current().unwrap()));
        assert!(defaults.is_sealed());
    }

    #[test]
    fn explicit_store_wins_and_does_not_seal() {
        let defaults = GlobalTlsDefaults::new();
        let installed = TestCa::new("installed");
        let explicit = TestCa::new("explicit");
        defaults.install(installed.store()).unwrap();

        let ctx = ClientContext::builder()
            .trust_store(Arc::new(explicit.store()))
            .build_with(&defaults)
            .unwrap();

        assert_eq!(**ctx.trust_store(), explicit.store());
        assert!(!defaults.is_sealed());
    }

    #[test]
    fn context_without_install_sees_library_default() {
        let defaults = GlobalTlsDefaults::new();
        let ctx = ClientContext::builder().build_with(&defaults).unwrap();
        assert_eq!(ctx.trust_store().origin(), StoreOrigin::LibraryDefault);
    }

    #[test]
    fn install_before_context_hides_library_default() {
        let defaults = GlobalTlsDefaults::new();
        let ca = TestCa::new("ordered");
        defaults.install(ca.store()).unwrap();

        for _ in 0..3 {
            let ctx = ClientContext::builder().build_with(&defaults).unwrap();
            assert_ne!(ctx.trust_store().origin(), StoreOrigin::LibraryDefault);
        }
        assert!(defaults.install(TestCa::new("late").store()).is_err());
    }

    #[test]
    fn handshake_succeeds_with_installed_store() {
        let defaults = GlobalTlsDefaults::new();
        let ca = TestCa::new("handshake");
        defaults.install(ca.store()).unwrap();

        let client = ClientContext::builder().build_with(&defaults).unwrap();
        handshake(&client, &server_for(&ca)).expect("handshake should succeed");
    }

    #[test]
    fn handshake_fails_with_library_default() {
        let ca = TestCa::new("unknown");
        let client = ClientContext::builder()
            .build_with(&GlobalTlsDefaults::new())
            .unwrap();

        let err = handshake(&client, &server_for(&ca)).unwrap_err();
        assert!(matches!(
            err,
            rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer)
        ));
    }

    #[test]
    fn revoked_server_cert_is_rejected() {
        let ca = TestCa::new("revoking");
        let mut builder = TrustStore::builder();
        builder.add_der(ca.cert_der());
        builder.add_crl_der(ca.crl(&[10]));
        let defaults = GlobalTlsDefaults::new();
        defaults.install(builder.build().unwrap()).unwrap();

        let client = ClientContext::builder().build_with(&defaults).unwrap();
        let err = handshake(&client, &server_for(&ca)).unwrap_err();
        assert!(matches!(
            err,
            rustls::Error::InvalidCertificate(CertificateError::Revoked)
        ));
    }

    #[test]
    fn unrevoked_server_cert_passes_crl_check() {
        let ca = TestCa::new("revoking");
        let mut builder = TrustStore::builder();
        builder.add_der(ca.cert_der());
        builder.add_crl_der(ca.crl(&[99]));
        let defaults = GlobalTlsDefaults::new();
        defaults.install(builder.build().unwrap()).unwrap();

        let client = ClientContext::builder().build_with(&defaults).unwrap();
        handshake(&client, &server_for(&ca)).expect("unrevoked leaf should be accepted");
    }

    #[test]
    fn strict_policy_denies_unknown_revocation_status() {
        let ca = TestCa::new("uncovered");
        let other = TestCa::new("other issuer");
        let mut builder = TrustStore::builder();
        builder.add_der(ca.cert_der());
        builder.add_crl_der(other.crl(&[10]));
        let store = Arc::new(builder.build().unwrap());
        let server = server_for(&ca);

        let lenient = ClientContext::builder()
            .trust_store(Arc::clone(&store))
            .build_with(&GlobalTlsDefaults::new())
            .unwrap();
        handshake(&lenient, &server).expect("unknown status is allowed by default");

        let strict = ClientContext::builder()
            .trust_store(store)
            .revocation(RevocationPolicy::strict())
            .build_with(&GlobalTlsDefaults::new())
            .unwrap();
        let err = handshake(&strict, &server).unwrap_err();
        assert!(matches!(
            err,
            rustls::Error::InvalidCertificate(CertificateError::UnknownRevocationStatus)
        ));
    }

    #[test]
    fn server_without_client_auth_leaves_defaults_open() {
        let defaults = GlobalTlsDefaults::new();
        let ca = TestCa::new("srv");
        let ctx = ServerContext::builder(ca.issue("localhost", 1))
            .build_with(&defaults)
            .unwrap();
        assert!(ctx.trust_store().is_none());
        assert!(!defaults.is_sealed());
    }

    #[test]
    fn mutual_tls_uses_default_store_on_server() {
        let defaults = GlobalTlsDefaults::new();
        let ca = TestCa::new("mtls");
        defaults.install(ca.store()).unwrap();

        let server = ServerContext::builder(ca.issue("localhost", 1))
            .client_auth(ClientAuth::Required)
            .build_with(&defaults)
            .unwrap();
        let client = ClientContext::builder()
            .client_identity(ca.issue("client.local", 2))
            .build_with(&defaults)
            .unwrap();

        assert_eq!(**server.trust_store().unwrap(), ca.store());
        handshake(&client, &server).expect("mTLS handshake should succeed");
    }

    #[test]
    fn required_client_auth_rejects_anonymous_client() {
        let defaults = GlobalTlsDefaults::new();
        let ca = TestCa::new("anon");
        defaults.install(ca.store()).unwrap();

        let server = ServerContext::builder(ca.issue("localhost", 1))
            .client_auth(ClientAuth::Required)
            .build_with(&defaults)
            .unwrap();
        let client = ClientContext::builder().build_with(&defaults).unwrap();

        assert!(handshake(&client, &server).is_err());
    }

    #[test]
    fn alpn_is_applied() {
        let ca = TestCa::new("alpn");
        let ctx = ClientContext::builder()
            .trust_store(Arc::new(ca.store()))
            .alpn_protocols(vec![b"h3".to_vec()])
            .protocol_versions(&[&rustls::version::TLS13])
            .build_with(&GlobalTlsDefaults::new())
            .unwrap();
        assert_eq!(ctx.config().alpn_protocols, vec![b"h3".to_vec()]);
    }
}
