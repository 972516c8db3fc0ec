use crate::config::ServerConfig;
use auth_ticket::TicketAuthority;
use error_common::{CasError, Result};
use handlebars::Handlebars;
use std::sync::Arc;
use std::time::Duration;

/// Name of the cookie carrying the TGT
pub const TICKET_GRANTING_COOKIE: &str = "TGC-session";

pub const LOGIN_TEMPLATE: &str = "login";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<TicketAuthority>,
    /// Server settings with URLs already resolved
    pub server: Arc<ServerConfig>,
    pub templates: Arc<Handlebars<'static>>,
    /// Client used by the demo application to call back into `/cas`
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(authority: Arc<TicketAuthority>, server: ServerConfig) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);
        templates
            .register_template_string(LOGIN_TEMPLATE, include_str!("../templates/login.hbs"))
            .map_err(|e| CasError::InternalError(format!("login template: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CasError::NetworkError(format!("http client: {e}")))?;

        Ok(Self {
            authority,
            server: Arc::new(server),
            templates: Arc::new(templates),
            http,
        })
    }
}
