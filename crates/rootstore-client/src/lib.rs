//! Client-side QUIC transport over the default trust store.
//!
//! - QUIC client (connection initiation via quinn)
//! - Server verification against the store resolved by the `ClientContext`
//! - Access to the verified server certificate chain

pub mod connection;
pub mod endpoint;
pub mod error;

pub use connection::TlsConnection;
pub use endpoint::ClientEndpoint;
pub use error::ClientError;
