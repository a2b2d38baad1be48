//! QUIC client endpoint.
//!
//! `ClientEndpoint` wraps a quinn client endpoint configured from a
//! [`ClientContext`]. A context built without an explicit store inherits the
//! process default, so the default must be installed before the context (and
//! therefore this endpoint) is created.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use rootstore::tls::ClientContext;
use rootstore::TrustStore;
use tracing::info;

use crate::connection::TlsConnection;
use crate::error::{ClientError, Result};

/// A QUIC client endpoint that verifies servers against a trust store.
pub struct ClientEndpoint {
    endpoint: quinn::Endpoint,
    trust_store: Arc<TrustStore>,
}

impl ClientEndpoint {
    /// Create a new client endpoint bound to an ephemeral port.
    pub fn new(context: &ClientContext) -> Result<Self> {
        Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)), context)
    }

    /// Create a client endpoint bound to `bind_addr`.
    pub fn bind(bind_addr: SocketAddr, context: &ClientContext) -> Result<Self> {
        let quic_client_config =
            quinn::crypto::rustls::QuicClientConfig::try_from(context.config())
                .map_err(|e| ClientError::TlsConfig(format!("rustls→quinn: {e}")))?;

        let client_config = quinn::ClientConfig::new(Arc::new(quic_client_config));

        let mut endpoint =
            quinn::Endpoint::client(bind_addr).map_err(|e| ClientError::Endpoint(e.to_string()))?;
        endpoint.set_default_client_config(client_config);

        Ok(Self {
            endpoint,
            trust_store: Arc::clone(context.trust_store()),
        })
    }

    /// Connect to a server and complete the TLS handshake.
    ///
    /// `server_name` must match a name in the server's certificate.
    pub async fn connect(&self, addr: SocketAddr, server_name: &str) -> Result<TlsConnection> {
        let connecting = self.endpoint.connect(addr, server_name)?;

        let quinn_conn = connecting.await?;

        let conn = TlsConnection::from_quinn(quinn_conn)?;

        info!(
            %addr,
            server_name,
            chain_len = conn.peer_certificates().len(),
            store = %self.trust_store.short_fingerprint(),
            "connected"
        );

        Ok(conn)
    }

    /// The store server certificates are verified against.
    pub fn trust_store(&self) -> &Arc<TrustStore> {
        &self.trust_store
    }

    /// Gracefully shut down the endpoint.
    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"shutdown");
    }
}
