// Logger configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Mask secrets and PII before anything reaches the output
    #[serde(default = "default_true")]
    pub redaction_enabled: bool,
    /// Emit one JSON object per event instead of human-readable lines
    #[serde(default)]
    pub json: bool,
    /// Filter directives used when `RUST_LOG` is not set
    #[serde(default = "default_filter")]
    pub default_filter: String,
}

fn default_true() -> bool { true }
fn default_filter() -> String { "info".to_string() }

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            json: false,
            default_filter: default_filter(),
        }
    }
}
