use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Ticket lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketConfig {
    #[serde(default = "default_service_ticket_ttl")]
    pub service_ticket_ttl_secs: u64,
    #[serde(default = "default_ticket_granting_ticket_ttl")]
    pub ticket_granting_ticket_ttl_secs: u64,
}

fn default_service_ticket_ttl() -> u64 { 10 }
fn default_ticket_granting_ticket_ttl() -> u64 { 8 * 60 * 60 }

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            service_ticket_ttl_secs: default_service_ticket_ttl(),
            ticket_granting_ticket_ttl_secs: default_ticket_granting_ticket_ttl(),
        }
    }
}

impl TicketConfig {
    pub fn service_ticket_ttl(&self) -> Duration {
        secs_to_duration(self.service_ticket_ttl_secs)
    }

    pub fn ticket_granting_ticket_ttl(&self) -> Duration {
        secs_to_duration(self.ticket_granting_ticket_ttl_secs)
    }
}

fn secs_to_duration(secs: u64) -> Duration {
    Duration::from_std(std::time::Duration::from_secs(secs)).unwrap_or(Duration::MAX)
}

/// Single logout delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SloConfig {
    #[serde(default = "default_slo_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Used for services without their own `logout_url`
    #[serde(default)]
    pub default_logout_url: Option<String>,
}

fn default_slo_timeout() -> u64 { 5 }
fn default_queue_capacity() -> usize { 1024 }

impl Default for SloConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_slo_timeout(),
            queue_capacity: default_queue_capacity(),
            default_logout_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let tickets = TicketConfig::default();
        assert_eq!(tickets.service_ticket_ttl(), Duration::seconds(10));
        assert_eq!(tickets.ticket_granting_ticket_ttl(), Duration::hours(8));

        let slo = SloConfig::default();
        assert_eq!(slo.timeout_secs, 5);
        assert!(slo.default_logout_url.is_none());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let config = TicketConfig {
            service_ticket_ttl_secs: u64::MAX,
            ..Default::default()
        };
        assert_eq!(config.service_ticket_ttl(), Duration::MAX);
    }
}
