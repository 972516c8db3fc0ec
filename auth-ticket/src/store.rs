use crate::{
    clock::{Clock, SystemClock},
    codec::{TicketError, TicketId, TicketKind},
    config::TicketConfig,
};
use auth_identity::User;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

struct GrantingEntry {
    secret: String,
    user: User,
    issued_at: DateTime<Utc>,
}

struct ServiceEntry {
    secret: String,
    user: User,
    service: String,
    issued_at: DateTime<Utc>,
    consumed: bool,
}

/// Outcome of a successful service ticket consumption
#[derive(Debug, Clone)]
pub struct ValidatedTicket {
    pub user: User,
    pub service: String,
}

/// A service ticket removed by logout
#[derive(Debug, Clone)]
pub struct RevokedTicket {
    pub id: TicketId,
    pub user: User,
    pub service: String,
    pub consumed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TicketCounts {
    pub ticket_granting_tickets: usize,
    pub service_tickets: usize,
    pub bindings: usize,
}

/// In-memory ticket tables
///
/// Each table is a [`DashMap`] keyed by ticket sequence, so operations on one
/// ticket lock one shard and unrelated tickets proceed in parallel. The
/// presented secret is checked against the stored one on every access.
pub struct TicketStore {
    granting: DashMap<u64, GrantingEntry>,
    service: DashMap<u64, ServiceEntry>,
    bindings: DashMap<u64, Vec<TicketId>>,
    next_granting: AtomicU64,
    next_service: AtomicU64,
    granting_ttl: Duration,
    service_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TicketStore {
    pub fn new(config: &TicketConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &TicketConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            granting: DashMap::new(),
            service: DashMap::new(),
            bindings: DashMap::new(),
            next_granting: AtomicU64::new(1),
            next_service: AtomicU64::new(1),
            granting_ttl: config.ticket_granting_ticket_ttl(),
            service_ttl: config.service_ticket_ttl(),
            clock,
        }
    }

    fn expired(&self, issued_at: DateTime<Utc>, ttl: Duration) -> bool {
        self.clock.now() - issued_at > ttl
    }

    pub fn create_tgt(&self, user: User) -> TicketId {
        let sequence = self.next_granting.fetch_add(1, Ordering::Relaxed);
        let id = TicketId::generate(TicketKind::TicketGrantingTicket, sequence);
        self.granting.insert(
            sequence,
            GrantingEntry {
                secret: id.secret().to_string(),
                user,
                issued_at: self.clock.now(),
            },
        );
        id
    }

    pub fn create_st(&self, user: User, service: &str) -> TicketId {
        let sequence = self.next_service.fetch_add(1, Ordering::Relaxed);
        let id = TicketId::generate(TicketKind::ServiceTicket, sequence);
        self.service.insert(
            sequence,
            ServiceEntry {
                secret: id.secret().to_string(),
                user,
                service: service.to_string(),
                issued_at: self.clock.now(),
                consumed: false,
            },
        );
        id
    }

    /// Read-only TGT check. Expired entries are left for [`purge_expired`].
    ///
    /// [`purge_expired`]: TicketStore::purge_expired
    pub fn validate_tgt(&self, id: &TicketId) -> Result<User, TicketError> {
        if id.kind() != TicketKind::TicketGrantingTicket {
            return Err(TicketError::NotRecognized);
        }
        let entry = self.granting.get(&id.sequence()).ok_or(TicketError::NotRecognized)?;
        if !id.secret_matches(&entry.secret) || self.expired(entry.issued_at, self.granting_ttl) {
            return Err(TicketError::NotRecognized);
        }
        Ok(entry.user.clone())
    }

    /// Mark a service ticket consumed, succeeding at most once per ticket.
    ///
    /// The check and the flag update happen under the entry's shard write
    /// lock, so concurrent callers with the same id are serialized.
    pub fn consume_st(&self, id: &TicketId) -> Result<ValidatedTicket, TicketError> {
        if id.kind() != TicketKind::ServiceTicket {
            return Err(TicketError::NotRecognized);
        }
        let mut entry = self.service.get_mut(&id.sequence()).ok_or(TicketError::NotRecognized)?;
        if !id.secret_matches(&entry.secret) {
            return Err(TicketError::NotRecognized);
        }
        if entry.consumed || self.expired(entry.issued_at, self.service_ttl) {
            return Err(TicketError::NotRecognized);
        }
        entry.consumed = true;
        Ok(ValidatedTicket {
            user: entry.user.clone(),
            service: entry.service.clone(),
        })
    }

    /// Remove a TGT, returning its owner. Idempotent.
    pub fn delete_tgt(&self, id: &TicketId) -> Option<String> {
        if id.kind() != TicketKind::TicketGrantingTicket {
            return None;
        }
        self.granting
            .remove_if(&id.sequence(), |_, entry| id.secret_matches(&entry.secret))
            .map(|(_, entry)| entry.user.username)
    }

    /// Record that `st` was issued under `tgt`.
    ///
    /// The TGT entry stays read-locked while the binding is written, so a
    /// concurrent [`delete_tgt`] either happens first (and this returns
    /// false) or waits until the binding is visible to [`unbind_all`].
    ///
    /// [`delete_tgt`]: TicketStore::delete_tgt
    /// [`unbind_all`]: TicketStore::unbind_all
    pub fn bind(&self, tgt: &TicketId, st: &TicketId) -> bool {
        if tgt.kind() != TicketKind::TicketGrantingTicket || st.kind() != TicketKind::ServiceTicket {
            return false;
        }
        let Some(entry) = self.granting.get(&tgt.sequence()) else {
            return false;
        };
        if !tgt.secret_matches(&entry.secret) || self.expired(entry.issued_at, self.granting_ttl) {
            return false;
        }
        self.bindings.entry(tgt.sequence()).or_default().push(st.clone());
        drop(entry);
        true
    }

    /// Take every ST bound to `tgt`, in issue order
    pub fn unbind_all(&self, tgt: &TicketId) -> Vec<TicketId> {
        self.bindings
            .remove(&tgt.sequence())
            .map(|(_, bound)| bound)
            .unwrap_or_default()
    }

    /// Forced deletion used by logout; succeeds whatever the ticket's state
    pub fn revoke_st(&self, id: &TicketId) -> Option<RevokedTicket> {
        if id.kind() != TicketKind::ServiceTicket {
            return None;
        }
        self.service
            .remove_if(&id.sequence(), |_, entry| id.secret_matches(&entry.secret))
            .map(|(_, entry)| RevokedTicket {
                id: id.clone(),
                user: entry.user,
                service: entry.service,
                consumed: entry.consumed,
            })
    }

    /// Drop every expired ticket and the bindings of expired TGTs
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut expired_granting = Vec::new();
        self.granting.retain(|sequence, entry| {
            let keep = now - entry.issued_at <= self.granting_ttl;
            if !keep {
                expired_granting.push(*sequence);
            }
            keep
        });
        for sequence in &expired_granting {
            self.bindings.remove(sequence);
        }

        let before = self.service.len();
        self.service
            .retain(|_, entry| now - entry.issued_at <= self.service_ttl);
        let purged = expired_granting.len() + before.saturating_sub(self.service.len());

        if purged > 0 {
            debug!(purged, "Purged expired tickets");
        }
        purged
    }

    pub fn counts(&self) -> TicketCounts {
        TicketCounts {
            ticket_granting_tickets: self.granting.len(),
            service_tickets: self.service.len(),
            bindings: self.bindings.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn casuser() -> User {
        User {
            username: "casuser".to_string(),
            mail: "casuser@example.org".to_string(),
            mobile: "12345678910".to_string(),
        }
    }

    fn create_test_store() -> (TicketStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = TicketStore::with_clock(&TicketConfig::default(), clock.clone());
        (store, clock)
    }

    #[test]
    fn test_sequences_increase_per_kind() {
        let (store, _) = create_test_store();
        let g1 = store.create_tgt(casuser());
        let g2 = store.create_tgt(casuser());
        let s1 = store.create_st(casuser(), "http://app.example");
        assert_eq!(g1.sequence() + 1, g2.sequence());
        assert_eq!(s1.sequence(), 1);
    }

    #[test]
    fn test_tgt_ttl_edges() {
        let (store, clock) = create_test_store();
        let tgt = store.create_tgt(casuser());

        clock.advance(Duration::hours(8) - Duration::milliseconds(1));
        assert_eq!(store.validate_tgt(&tgt).unwrap().username, "casuser");

        clock.advance(Duration::milliseconds(1));
        assert!(store.validate_tgt(&tgt).is_ok(), "exactly TTL is still valid");

        clock.advance(Duration::milliseconds(1));
        assert_eq!(store.validate_tgt(&tgt), Err(TicketError::NotRecognized));
    }

    #[test]
    fn test_st_single_use() {
        let (store, _) = create_test_store();
        let st = store.create_st(casuser(), "http://app.example");

        let validated = store.consume_st(&st).unwrap();
        assert_eq!(validated.service, "http://app.example");
        assert_eq!(store.consume_st(&st).unwrap_err(), TicketError::NotRecognized);
    }

    #[test]
    fn test_st_expires_unconsumed() {
        let (store, clock) = create_test_store();
        let st = store.create_st(casuser(), "http://app.example");
        clock.advance(Duration::seconds(10) + Duration::milliseconds(1));
        assert!(store.consume_st(&st).is_err());
    }

    #[test]
    fn test_forged_secret_rejected_without_burning() {
        let (store, _) = create_test_store();
        let st = store.create_st(casuser(), "http://app.example");
        let forged: TicketId = format!("ST-{}-AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", st.sequence())
            .parse()
            .unwrap();

        assert!(store.consume_st(&forged).is_err());
        assert!(store.revoke_st(&forged).is_none());
        assert!(store.consume_st(&st).is_ok());
    }

    #[test]
    fn test_kind_confusion_rejected() {
        let (store, _) = create_test_store();
        let tgt = store.create_tgt(casuser());
        let st = store.create_st(casuser(), "http://app.example");
        assert!(store.consume_st(&tgt).is_err());
        assert!(store.validate_tgt(&st).is_err());
    }

    #[test]
    fn test_bind_and_unbind_all() {
        let (store, _) = create_test_store();
        let tgt = store.create_tgt(casuser());
        let s1 = store.create_st(casuser(), "http://a.example");
        let s2 = store.create_st(casuser(), "http://b.example");

        assert!(store.bind(&tgt, &s1));
        assert!(store.bind(&tgt, &s2));
        assert_eq!(store.unbind_all(&tgt), vec![s1, s2]);
        assert!(store.unbind_all(&tgt).is_empty());
    }

    #[test]
    fn test_bind_after_delete_is_refused() {
        let (store, _) = create_test_store();
        let tgt = store.create_tgt(casuser());
        let st = store.create_st(casuser(), "http://app.example");

        assert_eq!(store.delete_tgt(&tgt).as_deref(), Some("casuser"));
        assert_eq!(store.delete_tgt(&tgt), None);
        assert!(!store.bind(&tgt, &st));
        assert_eq!(store.counts().bindings, 0);
    }

    #[test]
    fn test_revoke_reports_consumed_state() {
        let (store, _) = create_test_store();
        let used = store.create_st(casuser(), "http://app.example");
        let fresh = store.create_st(casuser(), "http://app.example");
        store.consume_st(&used).unwrap();

        assert!(store.revoke_st(&used).unwrap().consumed);
        assert!(!store.revoke_st(&fresh).unwrap().consumed);
        assert!(store.revoke_st(&fresh).is_none());
    }

    #[test]
    fn test_purge_expired() {
        let (store, clock) = create_test_store();
        let tgt = store.create_tgt(casuser());
        let st = store.create_st(casuser(), "http://app.example");
        assert!(store.bind(&tgt, &st));

        clock.advance(Duration::seconds(11));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.counts().service_tickets, 0);
        assert_eq!(store.counts().ticket_granting_tickets, 1);

        clock.advance(Duration::hours(8));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(
            store.counts(),
            TicketCounts { ticket_granting_tickets: 0, service_tickets: 0, bindings: 0 }
        );
    }

    #[test]
    fn test_concurrent_consume_single_winner() {
        let (store, _) = create_test_store();
        let store = Arc::new(store);
        let st = store.create_st(casuser(), "http://app.example");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let st = st.clone();
                std::thread::spawn(move || store.consume_st(&st).is_ok())
            })
            .collect();
        let winners = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(winners, 1);
    }
}
