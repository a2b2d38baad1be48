//! TLS contexts that inherit the default trust store.
//!
//! - Identity loading (certificate chain + private key)
//! - WebPKI verifiers with optional CRL checking
//! - Client and server context builders

pub mod config;
pub mod identity;
pub mod verifier;

pub use config::{ClientAuth, ClientContext, ClientContextBuilder, ServerContext, ServerContextBuilder};
pub use identity::TlsIdentity;
pub use verifier::{RevocationDepth, RevocationPolicy, UnknownStatus};
