use crate::{config::StaticUser, directory::UserDirectory, error::*, models::User};
use async_trait::async_trait;
use std::collections::HashMap;
use subtle::ConstantTimeEq;

const UNKNOWN_USER_PASSWORD: &str = "\0unknown-user\0";

/// Directory backed by a fixed in-memory table
pub struct StaticUserDirectory {
    users: HashMap<String, StaticUser>,
}

impl StaticUserDirectory {
    /// Build the table, rejecting duplicate usernames.
    pub fn new(users: Vec<StaticUser>) -> Result<Self> {
        let mut map = HashMap::with_capacity(users.len());
        for user in users {
            if user.username.is_empty() {
                return Err(IdentityError::Configuration("static user with empty username".to_string()));
            }
            if map.contains_key(&user.username) {
                return Err(IdentityError::Configuration(format!(
                    "duplicate username: {}",
                    user.username
                )));
            }
            map.insert(user.username.clone(), user);
        }
        Ok(Self { users: map })
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn validate_credentials(&self, username: &str, password: &str) -> Result<User> {
        let entry = self.users.get(username);
        // Unknown users still pay for a comparison.
        let expected = entry.map_or(UNKNOWN_USER_PASSWORD, |e| e.password.as_str());
        let matches: bool = expected.as_bytes().ct_eq(password.as_bytes()).into();
        let (Some(entry), true) = (entry, matches) else {
            return Err(IdentityError::InvalidCredentials);
        };

        Ok(User {
            username: entry.username.clone(),
            mail: entry.mail.clone(),
            mobile: entry.mobile.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_user_authenticates() {
        let directory = StaticUserDirectory::new(vec![StaticUser::default()]).unwrap();
        let user = directory.validate_credentials("casuser", "Mellon").await.unwrap();
        assert_eq!(user.username, "casuser");
        assert_eq!(user.mail, "casuser@example.org");
        assert_eq!(user.mobile, "12345678910");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let directory = StaticUserDirectory::new(vec![StaticUser::default()]).unwrap();

        let wrong = directory.validate_credentials("casuser", "mellon").await.unwrap_err();
        let unknown = directory.validate_credentials("nobody", "Mellon").await.unwrap_err();

        assert!(matches!(wrong, IdentityError::InvalidCredentials));
        assert!(matches!(unknown, IdentityError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_unknown_user_rejected_even_with_placeholder_password() {
        let directory = StaticUserDirectory::new(vec![StaticUser::default()]).unwrap();
        let result = directory.validate_credentials("nobody", UNKNOWN_USER_PASSWORD).await;
        assert!(matches!(result, Err(IdentityError::InvalidCredentials)));
    }

    #[test]
    fn test_duplicate_usernames_rejected() {
        let result = StaticUserDirectory::new(vec![StaticUser::default(), StaticUser::default()]);
        assert!(matches!(result, Err(IdentityError::Configuration(_))));
    }
}
