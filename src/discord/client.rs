//! Discord bot client abstraction.
//!
//! Provides a high-level interface for creating and running the Discord bot,
//! hiding serenity implementation details from the rest of the application.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use serenity::cache::Cache;
use serenity::gateway::GatewayError;
use serenity::http::Http;
use serenity::prelude::*;
use serenity::Client;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::discord::handler::BridgeHandler;

/// Create an exponential backoff iterator for Discord reconnection.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn discord_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

/// Errors no amount of reconnecting will fix.
fn is_fatal(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Gateway(
            GatewayError::InvalidAuthentication | GatewayError::DisallowedGatewayIntents
        )
    )
}

pub struct DiscordBot {
    client: Client,
}

impl DiscordBot {
    /// Build the serenity client. Nothing connects until [`DiscordBot::run`].
    pub async fn build(token: &str, handler: BridgeHandler) -> anyhow::Result<Self> {
        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILDS;

        let client = Client::builder(token, intents)
            .event_handler(handler)
            .await?;
        Ok(Self { client })
    }

    /// REST client shared with the chat gateway.
    pub fn http(&self) -> Arc<Http> {
        Arc::clone(&self.client.http)
    }

    /// Guild cache shared with the chat gateway.
    pub fn cache(&self) -> Arc<Cache> {
        Arc::clone(&self.client.cache)
    }

    /// Run the gateway connection until `cancel` fires or a fatal error occurs.
    pub async fn run(mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let shard_manager = Arc::clone(&self.client.shard_manager);
        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let result = tokio::select! {
                result = self.client.start() => result,
                _ = cancel.cancelled() => {
                    info!("Initiating graceful Discord shutdown...");
                    shard_manager.shutdown_all().await;
                    info!("Discord shutdown complete");
                    return Ok(());
                }
            };

            match result {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    return Ok(());
                }
                Err(e) if is_fatal(&e) => {
                    error!("Discord client error: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        _ = sleep(delay) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_fatal() {
        let err = serenity::Error::Gateway(GatewayError::InvalidAuthentication);
        assert!(is_fatal(&err));
        let err = serenity::Error::Gateway(GatewayError::NoAuthentication);
        assert!(!is_fatal(&err));
    }

    #[test]
    fn test_backoff_starts_at_five_seconds() {
        let first = discord_backoff().next().unwrap();
        assert!(first >= Duration::from_secs(5));
        assert!(first <= Duration::from_secs(10));
    }
}
