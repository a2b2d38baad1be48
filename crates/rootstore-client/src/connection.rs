//! Verified QUIC connection wrapper (client-side).
//!
//! After the TLS handshake succeeds, `TlsConnection` wraps the raw
//! `quinn::Connection` and keeps the server's certificate chain.

use rustls_pki_types::CertificateDer;

use crate::error::{ClientError, Result};

/// A QUIC connection whose server chain was verified against a trust store.
pub struct TlsConnection {
    inner: quinn::Connection,
    peer_chain: Vec<CertificateDer<'static>>,
}

impl TlsConnection {
    /// Wrap a raw quinn connection, capturing the server's certificate chain.
    pub fn from_quinn(conn: quinn::Connection) -> Result<Self> {
        let peer_chain = extract_peer_chain(&conn)?;
        Ok(Self {
            inner: conn,
            peer_chain,
        })
    }

    /// The server's certificate chain, leaf first.
    pub fn peer_certificates(&self) -> &[CertificateDer<'static>] {
        &self.peer_chain
    }

    /// The negotiated ALPN protocol, if any.
    pub fn alpn_protocol(&self) -> Option<Vec<u8>> {
        self.inner
            .handshake_data()
            .and_then(|data| data.downcast::<quinn::crypto::rustls::HandshakeData>().ok())
            .and_then(|data| data.protocol)
    }

    /// Access the underlying quinn connection.
    pub fn inner(&self) -> &quinn::Connection {
        &self.inner
    }
}

fn extract_peer_chain(conn: &quinn::Connection) -> Result<Vec<CertificateDer<'static>>> {
    let identity = conn
        .peer_identity()
        .ok_or_else(|| ClientError::PeerIdentity("no peer identity available".into()))?;

    let certs = identity
        .downcast::<Vec<CertificateDer<'static>>>()
        .map_err(|_| ClientError::PeerIdentity("failed to downcast peer identity".into()))?;

    if certs.is_empty() {
        return Err(ClientError::PeerIdentity(
            "peer certificate chain is empty".into(),
        ));
    }
    Ok(*certs)
}
