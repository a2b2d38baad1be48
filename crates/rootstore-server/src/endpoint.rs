//! QUIC server endpoint.
//!
//! `ServerEndpoint` wraps a quinn server endpoint, binding to a local address
//! and accepting incoming connections. Client certificates, when requested by
//! the [`ServerContext`], are verified against its trust store.

use std::net::SocketAddr;
use std::sync::Arc;

use rootstore::tls::ServerContext;
use tracing::info;

use crate::connection::TlsConnection;
use crate::error::{Result, ServerError};

/// A QUIC server endpoint.
pub struct ServerEndpoint {
    endpoint: quinn::Endpoint,
}

impl ServerEndpoint {
    /// Bind a QUIC server to the given address.
    pub fn bind(addr: SocketAddr, context: &ServerContext) -> Result<Self> {
        let quic_server_config =
            quinn::crypto::rustls::QuicServerConfig::try_from(context.config())
                .map_err(|e| ServerError::TlsConfig(format!("rustls→quinn: {e}")))?;

        let server_config = quinn::ServerConfig::with_crypto(Arc::new(quic_server_config));

        let endpoint = quinn::Endpoint::server(server_config, addr)
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        info!(
            %addr,
            client_auth = context.trust_store().is_some(),
            "server endpoint bound"
        );

        Ok(Self { endpoint })
    }

    /// Accept the next incoming connection and complete the TLS handshake.
    pub async fn accept(&self) -> Result<TlsConnection> {
        let incoming = self
            .endpoint
            .accept()
            .await
            .ok_or(ServerError::Accept(quinn::ConnectionError::LocallyClosed))?;

        let quinn_conn = incoming.await?;

        let conn = TlsConnection::from_quinn(quinn_conn)?;

        info!(
            remote = %conn.inner().remote_address(),
            client_authenticated = conn.is_client_authenticated(),
            "accepted connection"
        );

        Ok(conn)
    }

    /// Returns the local address this endpoint is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.endpoint
            .local_addr()
            .map_err(|e| ServerError::Bind(e.to_string()))
    }

    /// Gracefully shut down the endpoint.
    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"shutdown");
    }
}
