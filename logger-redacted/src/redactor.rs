use regex::Regex;
use lazy_static::lazy_static;
use sha2::{Sha256, Digest};
use base64::{Engine as _, engine::general_purpose};

// Patterns are literals; a failure to compile is a programming error.
#[allow(clippy::unwrap_used)]
mod patterns {
    use super::{lazy_static, Regex};

    lazy_static! {
        // <prefix>-<sequence>-<base32 secret>; prefix and sequence are public.
        pub(super) static ref TICKET_REGEX: Regex = Regex::new(r"\b(TGT|ST|PGT|PT)-(\d+)-([A-Z2-7]{8,})\b").unwrap();
        pub(super) static ref QUERY_PASSWORD_REGEX: Regex = Regex::new(r"(?i)\b(password|passwd|bind_pass)=([^&\s]+)").unwrap();
        pub(super) static ref DEBUG_PASSWORD_REGEX: Regex = Regex::new(r#"(?i)\b(password|bind_password)(\s*[:=]\s*)"[^"]*""#).unwrap();
        pub(super) static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
        pub(super) static ref PHONE_REGEX: Regex = Regex::new(r"(?:\+\d{1,3}[-.\s]?)?\b\d{10,15}\b|\(\d{3}\)\s?\d{3}-\d{4}").unwrap();
    }
}

use patterns::{DEBUG_PASSWORD_REGEX, EMAIL_REGEX, PHONE_REGEX, QUERY_PASSWORD_REGEX, TICKET_REGEX};

/// Redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_tickets: bool,
    pub redact_passwords: bool,
    pub redact_emails: bool,
    pub redact_phones: bool,
    /// Replace values with a short hash so related lines can still be joined
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_tickets: true,
            redact_passwords: true,
            redact_emails: true,
            redact_phones: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// Redactor for log messages
///
/// Ticket secrets are the bearer credential of an SSO session, so a log line
/// carrying one is as sensitive as a password. The kind prefix and sequence
/// number stay visible for correlation.
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_tickets {
            result = self.redact_tickets(&result);
        }

        if self.config.redact_passwords {
            result = Self::redact_passwords(&result);
        }

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    fn redact_tickets(&self, text: &str) -> String {
        TICKET_REGEX.replace_all(text, |caps: &regex::Captures| {
            let secret = caps.get(3).map_or("", |m| m.as_str());
            let prefix = caps.get(1).map_or("", |m| m.as_str());
            let sequence = caps.get(2).map_or("", |m| m.as_str());
            if self.config.hash_for_correlation {
                format!("{prefix}-{sequence}-[{}]", self.hash_value(secret))
            } else {
                format!("{prefix}-{sequence}-***")
            }
        }).to_string()
    }

    fn redact_passwords(text: &str) -> String {
        let result = QUERY_PASSWORD_REGEX.replace_all(text, "$1=***");
        DEBUG_PASSWORD_REGEX.replace_all(&result, "$1$2\"***\"").to_string()
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX.replace_all(text, |caps: &regex::Captures| {
            let email = caps.get(0).map_or("", |m| m.as_str());
            if self.config.hash_for_correlation {
                format!("EMAIL[{}]", self.hash_value(email))
            } else {
                match email.split_once('@') {
                    Some((local, domain)) => format!(
                        "{}***@{}***",
                        local.chars().next().unwrap_or('*'),
                        domain.chars().next().unwrap_or('*'),
                    ),
                    None => "***@***".to_string(),
                }
            }
        }).to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX.replace_all(text, |caps: &regex::Captures| {
            if self.config.hash_for_correlation {
                format!("PHONE[{}]", self.hash_value(caps.get(0).map_or("", |m| m.as_str())))
            } else {
                "***********".to_string()
            }
        }).to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let result = hasher.finalize();
        general_purpose::STANDARD_NO_PAD.encode(result.get(..6).unwrap_or_default())
    }
}
