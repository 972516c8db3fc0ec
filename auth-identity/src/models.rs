use serde::{Deserialize, Serialize};

/// Attributes released to services on successful ticket validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub mobile: String,
}
