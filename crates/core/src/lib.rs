//! Core types, tokens and validation for the compliance notifier.

pub mod enrichment;
pub mod error;
pub mod limits;
pub mod notification;
pub mod preferences;
pub mod recipients;
pub mod registry;
pub mod requirement;
pub mod unsubscribe;

pub use enrichment::*;
pub use error::{Error, ProviderErrorCode, Result, StoreErrorCode};
pub use notification::*;
pub use preferences::*;
pub use recipients::*;
pub use registry::{Cin, Din};
pub use requirement::*;
pub use unsubscribe::*;
