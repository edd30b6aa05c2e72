//! Transactional email delivery.
//!
//! Pipelines depend on [`EmailSender`]; [`ResendMailer`] is the HTTP
//! implementation used in production.

pub mod config;
pub mod resend;
pub mod sender;

pub use config::MailerConfig;
pub use resend::ResendMailer;
pub use sender::{EmailSender, OutgoingEmail, SendReceipt};
