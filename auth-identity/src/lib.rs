//! User directories for the MockCAS engine
//!
//! The ticket authority never looks at passwords itself. It asks a
//! [`UserDirectory`] whether a username/password pair is valid and receives
//! the user's attributes back. Two directories are provided:
//!
//! - [`StaticUserDirectory`]: a fixed table loaded from configuration
//! - [`LdapUserDirectory`]: search-then-bind against an LDAP server
//!
//! The backend is chosen once at startup from [`DirectoryConfig`].
//!
//! # Example
//!
//! ```rust
//! use auth_identity::{StaticUserDirectory, StaticUser, UserDirectory};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = StaticUserDirectory::new(vec![StaticUser::default()])?;
//! let user = directory.validate_credentials("casuser", "Mellon").await?;
//! assert_eq!(user.mail, "casuser@example.org");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod ldap;
pub mod models;
pub mod static_directory;

pub use config::*;
pub use directory::*;
pub use error::*;
pub use ldap::LdapUserDirectory;
pub use models::*;
pub use static_directory::StaticUserDirectory;
