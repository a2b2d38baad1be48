//! Accepted QUIC connection wrapper (server-side).
//!
//! Keeps the client's certificate chain when the client presented one. With
//! client auth disabled, or optional and skipped by the client, the chain is
//! empty.

use rustls_pki_types::CertificateDer;

use crate::error::{Result, ServerError};

/// An accepted QUIC connection.
pub struct TlsConnection {
    inner: quinn::Connection,
    client_chain: Vec<CertificateDer<'static>>,
}

impl TlsConnection {
    /// Wrap a raw quinn connection, capturing any client certificate chain.
    pub fn from_quinn(conn: quinn::Connection) -> Result<Self> {
        let client_chain = match conn.peer_identity() {
            None => Vec::new(),
            Some(identity) => *identity
                .downcast::<Vec<CertificateDer<'static>>>()
                .map_err(|_| ServerError::PeerIdentity("failed to downcast peer identity".into()))?,
        };
        Ok(Self {
            inner: conn,
            client_chain,
        })
    }

    /// The client's verified certificate chain, leaf first.
    pub fn client_certificates(&self) -> &[CertificateDer<'static>] {
        &self.client_chain
    }

    /// Whether the client authenticated with a certificate.
    pub fn is_client_authenticated(&self) -> bool {
        !self.client_chain.is_empty()
    }

    /// Access the underlying quinn connection.
    pub fn inner(&self) -> &quinn::Connection {
        &self.inner
    }
}
