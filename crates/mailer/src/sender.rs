//! Email sender seam.

use async_trait::async_trait;
use digest_core::Result;
use serde::{Deserialize, Serialize};

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    /// One-click unsubscribe target, sent as `List-Unsubscribe`.
    pub unsubscribe_url: Option<String>,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            html: html.into(),
            unsubscribe_url: None,
        }
    }

    pub fn with_unsubscribe_url(mut self, url: impl Into<String>) -> Self {
        self.unsubscribe_url = Some(url.into());
        self
    }
}

/// Provider acknowledgement of an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub id: Option<String>,
}

/// Transactional email sender.
///
/// `Ok` means the provider accepted the message. Any `Err` leaves the
/// caller's rows untouched so the send is retried on the next run.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt>;
}
