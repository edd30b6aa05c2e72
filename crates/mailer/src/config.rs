//! Mailer configuration.

use serde::{Deserialize, Serialize};

/// Resend-compatible mail API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    /// API key. `None` disables email delivery.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sender address, e.g. `Compliance <notifications@example.com>`
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_from() -> String {
    "Compliance Notifications <notifications@example.com>".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            from: default_from(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MailerConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}
