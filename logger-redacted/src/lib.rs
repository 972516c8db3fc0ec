//! Logging for the MockCAS engine with automatic redaction
//!
//! Every formatted event passes through a [`PiiRedactor`] before it reaches
//! stderr. The redactor masks:
//!
//! - **Ticket secrets**: `ST-42-RMMZGZFJ…` → `ST-42-[hash]` (prefix and
//!   sequence stay readable so a ticket can be followed across lines)
//! - **Passwords**: `password=Mellon` → `password=***`, and `password: "…"`
//!   in `Debug` output
//! - **Email addresses**: `casuser@example.org` → `EMAIL[hash]`
//! - **Phone numbers**: `12345678910` → `PHONE[hash]`
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{RedactedLogger, LoggerConfig};
//!
//! RedactedLogger::init(&LoggerConfig::default()).unwrap();
//! tracing::info!("issued ST-1-RMMZGZFJQDSETVTWAOTIBCPKXIRCI5ZF");
//! // Output: "issued ST-1-[Xk2v9Qa1]"
//! ```

pub mod config;
pub mod redactor;
pub mod writer;

pub use config::*;
pub use redactor::*;
pub use writer::*;

use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Installs the process-wide tracing subscriber
pub struct RedactedLogger;

impl RedactedLogger {
    /// Initialize global logging. `RUST_LOG` takes precedence over
    /// `config.default_filter`.
    pub fn init(config: &LoggerConfig) -> Result<(), LoggerError> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&config.default_filter)
                .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
        };

        let redactor = if config.redaction_enabled {
            PiiRedactor::default()
        } else {
            PiiRedactor::new(RedactionConfig {
                redact_tickets: false,
                redact_passwords: false,
                redact_emails: false,
                redact_phones: false,
                ..Default::default()
            })
        };
        let writer = RedactingMakeWriter::new(std::io::stderr, redactor);

        let result = if config.json {
            // Structured JSON logging for production
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_writer(writer)
                        .json(),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .try_init()
        };

        result.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
    }
}
