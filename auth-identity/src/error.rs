use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Directory returned {0} entries for one username")]
    AmbiguousUser(usize),

    #[error("Directory configuration error: {0}")]
    Configuration(String),

    #[error("Directory backend error: {0}")]
    Backend(String),
}

impl IdentityError {
    /// True for a plain wrong username/password, false for outages and
    /// misconfiguration that an operator needs to look at.
    pub fn is_rejection(&self) -> bool {
        matches!(self, IdentityError::InvalidCredentials)
    }
}

impl From<ldap3::LdapError> for IdentityError {
    fn from(err: ldap3::LdapError) -> Self {
        IdentityError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
