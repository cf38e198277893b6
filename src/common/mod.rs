//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;

pub use error::{ConfigError, GatewayError, RelayError};
pub use messages::{ChatMessage, Destination, Secret};
