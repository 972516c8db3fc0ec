use auth_identity::DirectoryConfig;
use auth_ticket::{default_services, Service, SloConfig, TicketConfig};
use config::{Config, Environment, File};
use error_common::{CasError, Result};
use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

/// Full server configuration
///
/// Sources, lowest precedence first: built-in defaults, the TOML file, then
/// `MOCKCAS__<SECTION>__<KEY>` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CasConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tickets: TicketConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default = "default_services")]
    pub services: Vec<Service>,
    #[serde(default)]
    pub slo: SloConfig,
    #[serde(default)]
    pub logging: LoggerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Public URL of the `/cas` endpoints; derived from `listen` when empty
    #[serde(default)]
    pub server_url_prefix: String,
    /// Service URL the demo client registers with; derived when empty
    #[serde(default)]
    pub client_service_url: String,
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

fn default_listen() -> String { "0.0.0.0:9090".to_string() }
fn default_purge_interval() -> u64 { 60 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            server_url_prefix: String::new(),
            client_service_url: String::new(),
            purge_interval_secs: default_purge_interval(),
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| CasError::ConfigError(format!("invalid listen address {}: {e}", self.listen)))
    }

    /// Fill in the URLs left empty, from the listen address.
    ///
    /// An unspecified bind host is advertised as loopback.
    pub fn resolve_urls(&mut self) -> Result<()> {
        let mut addr = self.listen_addr()?;
        if addr.ip().is_unspecified() {
            addr.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
        if self.server_url_prefix.is_empty() {
            self.server_url_prefix = format!("http://{addr}/cas");
        }
        if self.client_service_url.is_empty() {
            self.client_service_url = format!("http://{addr}/app/validate");
        }
        self.server_url_prefix = self.server_url_prefix.trim_end_matches('/').to_string();
        Ok(())
    }
}

impl CasConfig {
    /// Load configuration. A missing file is only an error when `path` was
    /// given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("mockcas").required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("MOCKCAS")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| CasError::ConfigError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_server() {
        let config = CasConfig::default();
        assert_eq!(config.server.listen, "0.0.0.0:9090");
        assert_eq!(config.tickets.service_ticket_ttl_secs, 10);
        assert_eq!(config.services.len(), 1);
        assert!(matches!(config.directory, DirectoryConfig::Static { .. }));
    }

    #[test]
    fn test_resolve_urls_from_listen() {
        let mut server = ServerConfig::default();
        server.resolve_urls().unwrap();
        assert_eq!(server.server_url_prefix, "http://127.0.0.1:9090/cas");
        assert_eq!(server.client_service_url, "http://127.0.0.1:9090/app/validate");
    }

    #[test]
    fn test_resolve_keeps_explicit_urls() {
        let mut server = ServerConfig {
            listen: "127.0.0.1:8443".to_string(),
            server_url_prefix: "https://sso.example/cas/".to_string(),
            ..Default::default()
        };
        server.resolve_urls().unwrap();
        assert_eq!(server.server_url_prefix, "https://sso.example/cas");
        assert_eq!(server.client_service_url, "http://127.0.0.1:8443/app/validate");
    }

    #[test]
    fn test_bad_listen_address() {
        let mut server = ServerConfig {
            listen: "localhost".to_string(),
            ..Default::default()
        };
        assert!(matches!(server.resolve_urls(), Err(CasError::ConfigError(_))));
    }

    #[test]
    fn test_load_toml_file() {
        let path = std::env::temp_dir().join(format!("mockcas-test-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
listen = "127.0.0.1:7000"

[tickets]
service_ticket_ttl_secs = 30

[directory]
method = "static"

[[directory.users]]
username = "alice"
password = "wonderland"
mail = "alice@example.org"

[[services]]
name = "Portal"
url_pattern = "https://portal\\.example/.*"
logout_url = "https://portal.example/slo"

[slo]
default_logout_url = "http://127.0.0.1:7000/app/slo"
"#
        )
        .unwrap();

        let config = CasConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:7000");
        assert_eq!(config.tickets.service_ticket_ttl_secs, 30);
        assert_eq!(config.tickets.ticket_granting_ticket_ttl_secs, 28800);
        assert_eq!(config.services[0].name, "Portal");
        assert_eq!(config.services[0].logout_url.as_deref(), Some("https://portal.example/slo"));
        assert_eq!(config.slo.timeout_secs, 5);
        assert!(matches!(
            &config.directory,
            DirectoryConfig::Static { users } if users.len() == 1 && users[0].username == "alice"
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let missing = Path::new("/nonexistent/mockcas.toml");
        assert!(CasConfig::load(Some(missing)).is_err());
    }
}
