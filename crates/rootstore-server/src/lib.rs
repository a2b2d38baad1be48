//! Server-side QUIC transport over the default trust store.
//!
//! - QUIC server (accepts incoming connections via quinn)
//! - Optional client-certificate verification against the store resolved by
//!   the `ServerContext`

pub mod connection;
pub mod endpoint;
pub mod error;

pub use connection::TlsConnection;
pub use endpoint::ServerEndpoint;
pub use error::ServerError;
