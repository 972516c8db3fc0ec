use data_encoding::BASE32_NOPAD;
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    #[error("Malformed ticket: {0}")]
    Malformed(&'static str),

    /// Absent, expired, consumed, revoked or forged. Deliberately one variant.
    #[error("Ticket not recognized")]
    NotRecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketKind {
    TicketGrantingTicket,
    ServiceTicket,
}

impl TicketKind {
    pub const fn prefix(self) -> &'static str {
        match self {
            TicketKind::TicketGrantingTicket => "TGT",
            TicketKind::ServiceTicket => "ST",
        }
    }

    /// Random bytes drawn for the secret part
    pub const fn secret_len(self) -> usize {
        match self {
            TicketKind::TicketGrantingTicket => 40,
            TicketKind::ServiceTicket => 20,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "TGT" => Some(TicketKind::TicketGrantingTicket),
            "ST" => Some(TicketKind::ServiceTicket),
            _ => None,
        }
    }
}

/// A ticket identifier in its decoded form
///
/// Only `secret` is a credential. Equality compares it in constant time and
/// `Debug` never prints it.
#[derive(Clone)]
pub struct TicketId {
    kind: TicketKind,
    sequence: u64,
    secret: String,
}

impl TicketId {
    /// Draw a fresh secret from the OS CSPRNG
    pub fn generate(kind: TicketKind, sequence: u64) -> Self {
        let mut bytes = vec![0u8; kind.secret_len()];
        OsRng.fill_bytes(&mut bytes);
        Self {
            kind,
            sequence,
            secret: BASE32_NOPAD.encode(&bytes),
        }
    }

    pub fn kind(&self) -> TicketKind {
        self.kind
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }

    /// Constant-time check of a presented secret against a stored one
    pub(crate) fn secret_matches(&self, stored: &str) -> bool {
        let presented = self.secret.as_bytes();
        let stored = stored.as_bytes();
        presented.len() == stored.len() && bool::from(presented.ct_eq(stored))
    }
}

impl PartialEq for TicketId {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.sequence == other.sequence && self.secret_matches(&other.secret)
    }
}

impl Eq for TicketId {}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.kind.prefix(), self.sequence, self.secret)
    }
}

impl fmt::Debug for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TicketId({}-{}-***)", self.kind.prefix(), self.sequence)
    }
}

fn is_base32_char(c: u8) -> bool {
    c.is_ascii_uppercase() || (b'2'..=b'7').contains(&c)
}

impl FromStr for TicketId {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split('-');
        let (Some(prefix), Some(sequence), Some(secret), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(TicketError::Malformed("expected <kind>-<sequence>-<secret>"));
        };

        let kind = TicketKind::from_prefix(prefix).ok_or(TicketError::Malformed("unknown ticket kind"))?;

        if sequence.is_empty() || !sequence.bytes().all(|c| c.is_ascii_digit()) {
            return Err(TicketError::Malformed("sequence must be decimal digits"));
        }
        // Sequences start at 1 and are written without padding.
        if sequence.starts_with('0') {
            return Err(TicketError::Malformed("sequence must be canonical"));
        }
        let sequence = sequence
            .parse::<u64>()
            .map_err(|_| TicketError::Malformed("sequence out of range"))?;

        if secret.is_empty() || !secret.bytes().all(is_base32_char) {
            return Err(TicketError::Malformed("secret must be base32"));
        }

        Ok(Self {
            kind,
            sequence,
            secret: secret.to_string(),
        })
    }
}
