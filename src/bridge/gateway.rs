//! Boundary to the chat platform.

use serenity::async_trait;

use crate::common::{Destination, GatewayError};

/// Delivers plain text to a chat destination.
///
/// Shared by every relay's forwarder, so implementations must tolerate
/// concurrent calls. Delivery is best effort.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send(&self, destination: Destination, text: &str) -> Result<(), GatewayError>;
}
