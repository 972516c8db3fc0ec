use serde::{Deserialize, Serialize};
use std::fmt;

/// Which credential backend to use
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum DirectoryConfig {
    Static {
        #[serde(default = "default_static_users")]
        users: Vec<StaticUser>,
    },
    Ldap(LdapConfig),
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig::Static {
            users: default_static_users(),
        }
    }
}

/// One entry of the static user table
#[derive(Clone, Serialize, Deserialize)]
pub struct StaticUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub mobile: String,
}

impl Default for StaticUser {
    fn default() -> Self {
        Self {
            username: "casuser".to_string(),
            password: "Mellon".to_string(),
            mail: "casuser@example.org".to_string(),
            mobile: "12345678910".to_string(),
        }
    }
}

impl fmt::Debug for StaticUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticUser")
            .field("username", &self.username)
            .field("password", &"***")
            .finish_non_exhaustive()
    }
}

/// LDAP search-then-bind settings
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// e.g. `ldap://127.0.0.1:389`
    pub server_url: String,
    /// Service account used for the search
    pub bind_dn: String,
    pub bind_password: String,
    pub base_dn: String,
    /// `%s` is replaced with the escaped username
    #[serde(default = "default_search_filter")]
    pub search_filter: String,
    #[serde(default = "default_mail_attribute")]
    pub mail_attribute: String,
    #[serde(default = "default_mobile_attribute")]
    pub mobile_attribute: String,
    #[serde(default = "default_ldap_timeout")]
    pub timeout_secs: u64,
}

impl fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConfig")
            .field("server_url", &self.server_url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"***")
            .field("base_dn", &self.base_dn)
            .field("search_filter", &self.search_filter)
            .finish_non_exhaustive()
    }
}

fn default_static_users() -> Vec<StaticUser> { vec![StaticUser::default()] }
fn default_search_filter() -> String { "(&(objectClass=person)(uid=%s))".to_string() }
fn default_mail_attribute() -> String { "mail".to_string() }
fn default_mobile_attribute() -> String { "mobile".to_string() }
fn default_ldap_timeout() -> u64 { 5 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_static_casuser() {
        match DirectoryConfig::default() {
            DirectoryConfig::Static { users } => {
                assert_eq!(users.len(), 1);
                assert_eq!(users[0].username, "casuser");
            }
            DirectoryConfig::Ldap(_) => panic!("default directory should be static"),
        }
    }

    #[test]
    fn test_debug_hides_passwords() {
        let rendered = format!("{:?}", StaticUser::default());
        assert!(!rendered.contains("Mellon"));
    }
}
