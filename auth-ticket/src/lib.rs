//! CAS ticket authority for the MockCAS engine
//!
//! This crate holds every piece of session state the CAS server has:
//!
//! - [`codec`]: the `<TGT|ST>-<sequence>-<secret>` identifier format
//! - [`store`]: the concurrent in-memory ticket tables and TGT bindings
//! - [`registry`]: which service URLs may receive tickets
//! - [`slo`]: fire-and-forget single logout notification
//! - [`authority`]: the CAS verbs built on top of the above
//!
//! # Example
//!
//! ```rust
//! use auth_identity::{StaticUser, StaticUserDirectory};
//! use auth_ticket::{default_services, NoopNotifier, ServiceRegistry, TicketAuthority, TicketConfig, TicketStore};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let authority = TicketAuthority::new(
//!     Arc::new(TicketStore::new(&TicketConfig::default())),
//!     Arc::new(StaticUserDirectory::new(vec![StaticUser::default()])?),
//!     Arc::new(ServiceRegistry::new(default_services())?),
//!     Arc::new(NoopNotifier),
//! );
//!
//! let tgt = authority.login("casuser", "Mellon").await?;
//! let st = authority.issue_service_ticket(&tgt, "http://app.example").await?;
//! let user = authority.validate_service_ticket(&st.to_string(), "http://app.example").await?;
//! assert_eq!(user.username, "casuser");
//! # Ok(())
//! # }
//! ```

pub mod authority;
pub mod clock;
pub mod codec;
pub mod config;
pub mod registry;
pub mod slo;
pub mod store;

pub use authority::{AuthorityError, LogoutSummary, TicketAuthority};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{TicketError, TicketId, TicketKind};
pub use config::{SloConfig, TicketConfig};
pub use registry::{default_services, RegistryError, Service, ServiceRegistry};
pub use slo::{encode_logout_request, LogoutNotice, LogoutNotifier, NoopNotifier, SloDispatcher, SloError};
pub use store::{RevokedTicket, TicketCounts, TicketStore, ValidatedTicket};
