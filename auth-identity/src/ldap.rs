use crate::{config::LdapConfig, directory::UserDirectory, error::*, models::User};
use async_trait::async_trait;
use ldap3::{ldap_escape, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// LDAP result code for a failed bind with a wrong password
const LDAP_INVALID_CREDENTIALS: u32 = 49;

/// Directory that authenticates by search-then-bind against an LDAP server
///
/// Every validation opens a fresh connection, binds as the service account,
/// looks the username up, and re-binds as the found entry with the presented
/// password.
pub struct LdapUserDirectory {
    config: LdapConfig,
}

impl LdapUserDirectory {
    pub fn new(config: LdapConfig) -> Result<Self> {
        if !config.search_filter.contains("%s") {
            return Err(IdentityError::Configuration(
                "ldap search_filter must contain a %s placeholder".to_string(),
            ));
        }
        if config.server_url.is_empty() || config.base_dn.is_empty() {
            return Err(IdentityError::Configuration(
                "ldap server_url and base_dn are required".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Filter for one username, with LDAP filter metacharacters escaped
    pub fn search_filter_for(&self, username: &str) -> String {
        self.config.search_filter.replace("%s", &ldap_escape(username))
    }

    async fn connect(&self) -> Result<Ldap> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.timeout_secs));
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.config.server_url).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection error");
            }
        });
        Ok(ldap)
    }

    async fn search_and_bind(&self, username: &str, password: &str) -> Result<User> {
        let mut ldap = self.connect().await?;

        ldap.simple_bind(&self.config.bind_dn, &self.config.bind_password)
            .await?
            .success()
            .map_err(|e| IdentityError::Backend(format!("service account bind failed: {e}")))?;

        let filter = self.search_filter_for(username);
        let (entries, _) = ldap
            .search(&self.config.base_dn, Scope::Subtree, &filter, vec!["*"])
            .await?
            .success()?;

        let entry = match entries.len() {
            0 => {
                let _ = ldap.unbind().await;
                return Err(IdentityError::InvalidCredentials);
            }
            1 => entries.into_iter().next().map(SearchEntry::construct),
            n => {
                let _ = ldap.unbind().await;
                return Err(IdentityError::AmbiguousUser(n));
            }
        };
        let Some(entry) = entry else {
            return Err(IdentityError::InvalidCredentials);
        };

        let bind = ldap.simple_bind(&entry.dn, password).await?;
        if bind.rc == LDAP_INVALID_CREDENTIALS {
            let _ = ldap.unbind().await;
            return Err(IdentityError::InvalidCredentials);
        }
        bind.success()?;

        if let Err(e) = ldap.unbind().await {
            debug!(error = %e, "LDAP unbind failed");
        }

        Ok(User {
            username: username.to_string(),
            mail: first_value(&entry.attrs, &self.config.mail_attribute),
            mobile: first_value(&entry.attrs, &self.config.mobile_attribute),
        })
    }
}

fn first_value(attrs: &HashMap<String, Vec<String>>, name: &str) -> String {
    attrs
        .get(name)
        .and_then(|values| values.first())
        .cloned()
        .unwrap_or_default()
}

#[async_trait]
impl UserDirectory for LdapUserDirectory {
    async fn validate_credentials(&self, username: &str, password: &str) -> Result<User> {
        // An empty password is an anonymous bind, which most servers accept.
        if username.is_empty() || password.is_empty() {
            return Err(IdentityError::InvalidCredentials);
        }

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(timeout, self.search_and_bind(username, password)).await {
            Ok(result) => result,
            Err(_) => Err(IdentityError::Backend(format!(
                "ldap request timed out after {}s",
                self.config.timeout_secs
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "ldap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LdapConfig {
        LdapConfig {
            server_url: "ldap://127.0.0.1:1".to_string(),
            bind_dn: "cn=admin,dc=example,dc=org".to_string(),
            bind_password: "secret".to_string(),
            base_dn: "dc=example,dc=org".to_string(),
            search_filter: "(&(objectClass=person)(uid=%s))".to_string(),
            mail_attribute: "mail".to_string(),
            mobile_attribute: "mobile".to_string(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_filter_escapes_username() {
        let directory = LdapUserDirectory::new(config()).unwrap();
        let filter = directory.search_filter_for("bob)(uid=*");
        assert_eq!(filter, "(&(objectClass=person)(uid=bob\\29\\28uid=\\2a))");
    }

    #[test]
    fn test_filter_without_placeholder_rejected() {
        let mut cfg = config();
        cfg.search_filter = "(uid=admin)".to_string();
        assert!(matches!(
            LdapUserDirectory::new(cfg),
            Err(IdentityError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_password_never_reaches_server() {
        let directory = LdapUserDirectory::new(config()).unwrap();
        let err = directory.validate_credentials("casuser", "").await.unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_backend_error() {
        let directory = LdapUserDirectory::new(config()).unwrap();
        let err = directory.validate_credentials("casuser", "Mellon").await.unwrap_err();
        assert!(!err.is_rejection());
    }
}
