use crate::{
    codec::TicketId,
    registry::{RegistryError, Service, ServiceRegistry},
    slo::{LogoutNotice, LogoutNotifier},
    store::{TicketCounts, TicketStore},
};
use auth_identity::{IdentityError, User, UserDirectory};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum AuthorityError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Ticket not recognized")]
    InvalidTicket,

    #[error("Unauthorized service: {0}")]
    UnauthorizedService(String),

    /// The directory could not answer; not the user's fault
    #[error("User directory unavailable: {0}")]
    Directory(IdentityError),
}

impl From<IdentityError> for AuthorityError {
    fn from(err: IdentityError) -> Self {
        if err.is_rejection() {
            AuthorityError::InvalidCredentials
        } else {
            AuthorityError::Directory(err)
        }
    }
}

impl From<RegistryError> for AuthorityError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnauthorizedService(url) => AuthorityError::UnauthorizedService(url),
            RegistryError::InvalidPattern { name, .. } => AuthorityError::UnauthorizedService(name),
        }
    }
}

/// Result of one logout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutSummary {
    /// `None` when the TGT was already gone
    pub owner: Option<String>,
    /// Service tickets removed from the store
    pub revoked: usize,
    /// Notices handed to the notifier
    pub notified: usize,
}

/// CAS protocol verbs over a [`TicketStore`]
///
/// All ticket state changes go through the store; the authority adds the
/// credential, service and single logout rules.
pub struct TicketAuthority {
    store: Arc<TicketStore>,
    directory: Arc<dyn UserDirectory>,
    registry: Arc<ServiceRegistry>,
    notifier: Arc<dyn LogoutNotifier>,
}

impl TicketAuthority {
    pub fn new(
        store: Arc<TicketStore>,
        directory: Arc<dyn UserDirectory>,
        registry: Arc<ServiceRegistry>,
        notifier: Arc<dyn LogoutNotifier>,
    ) -> Self {
        Self {
            store,
            directory,
            registry,
            notifier,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TicketId, AuthorityError> {
        let user = match self.directory.validate_credentials(username, password).await {
            Ok(user) => user,
            Err(e) if e.is_rejection() => {
                info!(username = %username, "Login rejected");
                return Err(AuthorityError::InvalidCredentials);
            }
            Err(e) => {
                warn!(directory = self.directory.name(), error = %e, "User directory failure");
                return Err(e.into());
            }
        };
        let tgt = self.store.create_tgt(user);
        info!(username = %username, tgt = %tgt, "Ticket granting ticket issued");
        Ok(tgt)
    }

    /// User behind a live TGT
    pub fn session_user(&self, tgt: &TicketId) -> Result<User, AuthorityError> {
        self.store.validate_tgt(tgt).map_err(|_| AuthorityError::InvalidTicket)
    }

    pub fn service(&self, url: &str) -> Result<Arc<Service>, AuthorityError> {
        Ok(self.registry.matches(url)?)
    }

    pub async fn issue_service_ticket(
        &self,
        tgt: &TicketId,
        service_url: &str,
    ) -> Result<TicketId, AuthorityError> {
        let user = self.store.validate_tgt(tgt).map_err(|_| AuthorityError::InvalidTicket)?;
        let service = self.registry.matches(service_url)?;

        let st = self.store.create_st(user, service_url);
        if !self.store.bind(tgt, &st) {
            // Logout won the race; the ticket must not outlive it.
            self.store.revoke_st(&st);
            debug!(tgt = %tgt, "TGT revoked during service ticket issue");
            return Err(AuthorityError::InvalidTicket);
        }

        info!(service = %service.name, st = %st, "Service ticket issued");
        Ok(st)
    }

    /// Consume `ticket` and check it was issued for `service_url`.
    ///
    /// The ticket is burned even when the service does not match.
    pub async fn validate_service_ticket(
        &self,
        ticket: &str,
        service_url: &str,
    ) -> Result<User, AuthorityError> {
        let st: TicketId = ticket.parse().map_err(|_| AuthorityError::InvalidTicket)?;
        let validated = self.store.consume_st(&st).map_err(|_| {
            debug!(st = %st, "Service ticket not recognized");
            AuthorityError::InvalidTicket
        })?;

        if validated.service != service_url {
            warn!(
                st = %st,
                issued_for = %validated.service,
                presented_for = %service_url,
                "Service ticket presented for another service"
            );
            return Err(AuthorityError::InvalidTicket);
        }

        info!(st = %st, username = %validated.user.username, "Service ticket validated");
        Ok(validated.user)
    }

    /// Revoke a TGT and every ST it spawned.
    ///
    /// One notice goes out per revoked ST that had not been validated yet;
    /// the notifier is non-blocking so this returns before any delivery.
    pub async fn logout(&self, tgt: &str) -> LogoutSummary {
        let Ok(tgt) = tgt.parse::<TicketId>() else {
            return LogoutSummary::default();
        };
        let Some(owner) = self.store.delete_tgt(&tgt) else {
            debug!(tgt = %tgt, "Logout for unknown TGT");
            return LogoutSummary::default();
        };

        let mut summary = LogoutSummary {
            owner: Some(owner),
            ..LogoutSummary::default()
        };
        for st in self.store.unbind_all(&tgt) {
            let Some(revoked) = self.store.revoke_st(&st) else {
                continue;
            };
            summary.revoked += 1;
            if revoked.consumed {
                continue;
            }
            let logout_url = self
                .registry
                .matches(&revoked.service)
                .ok()
                .and_then(|service| service.logout_url.clone());
            self.notifier.notify(LogoutNotice {
                username: revoked.user.username,
                session_index: revoked.id.to_string(),
                logout_url,
            });
            summary.notified += 1;
        }

        info!(
            tgt = %tgt,
            revoked = summary.revoked,
            notified = summary.notified,
            "Logout complete"
        );
        summary
    }

    pub fn counts(&self) -> TicketCounts {
        self.store.counts()
    }

    /// Sweep expired tickets; run periodically by the server
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }
}
