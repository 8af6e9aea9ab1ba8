//! Shared types and error hierarchy for Sensei.

pub mod error;
pub mod message;
pub mod util;

pub use error::{ChatError, ConfigError, StoreError, ValidationError};
pub use message::*;
