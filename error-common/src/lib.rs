//! Common error handling utilities for the MockCAS engine
//!
//! This crate holds the infrastructure error type shared by the server
//! binary and its supporting crates, plus the failure codes the CAS protocol
//! puts on the wire.
//!
//! Protocol-level failures (bad credentials, unknown tickets, unregistered
//! services) are *not* modelled here. They belong to the crates that
//! produce them and are mapped to responses by the HTTP layer. `CasError`
//! covers what can stop the process from serving at all: configuration,
//! sockets, directory backends.
//!
//! # Example
//!
//! ```rust
//! use error_common::{CasError, Result};
//!
//! fn listen_addr(raw: &str) -> Result<std::net::SocketAddr> {
//!     raw.parse()
//!         .map_err(|e| CasError::ConfigError(format!("invalid listen address {raw}: {e}")))
//! }
//!
//! assert!(listen_addr("127.0.0.1:9090").is_ok());
//! assert!(listen_addr("nowhere").is_err());
//! ```

pub mod codes;
pub mod types;

pub use codes::*;
pub use types::*;
