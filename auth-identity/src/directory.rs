use crate::{config::DirectoryConfig, error::Result, models::User};
use crate::{ldap::LdapUserDirectory, static_directory::StaticUserDirectory};
use async_trait::async_trait;
use std::sync::Arc;

/// Credential verification capability
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Check a username/password pair and return the user's attributes.
    ///
    /// Wrong credentials are always [`IdentityError::InvalidCredentials`],
    /// whether the username is unknown or the password is wrong.
    ///
    /// [`IdentityError::InvalidCredentials`]: crate::IdentityError::InvalidCredentials
    async fn validate_credentials(&self, username: &str, password: &str) -> Result<User>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Build the directory selected by configuration
pub fn build_directory(config: &DirectoryConfig) -> Result<Arc<dyn UserDirectory>> {
    match config {
        DirectoryConfig::Static { users } => {
            Ok(Arc::new(StaticUserDirectory::new(users.clone())?))
        }
        DirectoryConfig::Ldap(ldap) => Ok(Arc::new(LdapUserDirectory::new(ldap.clone())?)),
    }
}
