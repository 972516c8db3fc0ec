use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid url_pattern for service {name}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unauthorized service: {0}")]
    UnauthorizedService(String),
}

/// A CAS client application allowed to receive tickets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Regular expression the whole service URL must match
    pub url_pattern: String,
    /// Where single logout requests for this service are posted
    #[serde(default)]
    pub logout_url: Option<String>,
}

/// The permissive registry a fresh install starts with
pub fn default_services() -> Vec<Service> {
    vec![Service {
        name: "Test App".to_string(),
        description: "This is a test application.".to_string(),
        url_pattern: "https?://.*".to_string(),
        logout_url: None,
    }]
}

pub struct ServiceRegistry {
    services: Vec<(Regex, Arc<Service>)>,
}

impl ServiceRegistry {
    /// Compile every pattern up front; a bad pattern fails startup
    pub fn new(services: Vec<Service>) -> Result<Self, RegistryError> {
        let services = services
            .into_iter()
            .map(|service| {
                let anchored = format!("^(?:{})$", service.url_pattern);
                Regex::new(&anchored)
                    .map(|pattern| (pattern, Arc::new(service.clone())))
                    .map_err(|source| RegistryError::InvalidPattern {
                        name: service.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { services })
    }

    /// First registered service whose pattern matches `url`
    pub fn matches(&self, url: &str) -> Result<Arc<Service>, RegistryError> {
        self.services
            .iter()
            .find(|(pattern, _)| pattern.is_match(url))
            .map(|(_, service)| service.clone())
            .ok_or_else(|| RegistryError::UnauthorizedService(url.to_string()))
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
