//! econ-bridge - Discord chat bridge for Teeworlds/DDNet external consoles
//!
//! Connects to one or more game servers over ECON and relays chat,
//! joins and leaves to Discord channels, and Discord messages back in game.

mod bridge;
mod common;
mod config;
mod discord;
mod game;
mod protocol;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use bridge::{MessageFilter, RelayTemplate, RestartPolicy, SubscriberRegistry, Supervisor};
use config::{env::get_config_path, load_and_validate};
use discord::{BridgeHandler, DiscordBot, DiscordGateway, MessageResolver};
use game::{Classifier, MessageFormatter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("econ-bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    let relay_config = config.relay();
    info!("Configuration loaded successfully");
    for server in &config.servers {
        info!(
            server = %server.name,
            "  {}:{} ({}) -> channel {}",
            server.host, server.port, server.dialect, server.channel
        );
    }

    // ============================================================
    // Shared relay state
    // ============================================================
    let classifier = Arc::new(Classifier::new()?);
    let (game_to_chat, chat_to_game) = config.filter_patterns();
    let filter = Arc::new(MessageFilter::new(&game_to_chat, &chat_to_game));
    if filter.has_patterns() {
        info!(
            "Message filters enabled ({} game -> chat, {} chat -> game)",
            game_to_chat.len(),
            chat_to_game.len()
        );
    }
    let registry = Arc::new(SubscriberRegistry::new());
    let templates = config
        .servers
        .iter()
        .map(|server| RelayTemplate::from_config(server, &relay_config))
        .collect::<Result<Vec<_>, _>>()?;
    let policy = RestartPolicy::from_config(&relay_config);

    // ============================================================
    // Discord
    // ============================================================
    let handler = BridgeHandler::new(
        Arc::clone(&registry),
        MessageResolver::new(config.markdown_enabled())?,
        MessageFormatter::new(relay_config.chat_to_game_format()),
        config.commands_enabled(),
    );
    let discord_bot = DiscordBot::build(config.discord.token.expose(), handler).await?;
    let gateway = Arc::new(DiscordGateway::new(
        discord_bot.http(),
        discord_bot.cache(),
        MessageResolver::new(config.markdown_enabled())?,
    ));

    let supervisor = Supervisor::new(templates, classifier, filter, registry, gateway, policy);

    // ============================================================
    // Run everything
    // ============================================================
    let cancel = CancellationToken::new();

    info!("Starting Discord bot...");
    let mut discord_task = tokio::spawn(discord_bot.run(cancel.child_token()));

    info!("Starting {} relays...", config.servers.len());
    let mut relay_task = tokio::spawn(supervisor.run(cancel.child_token()));

    tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - disconnecting relays...");
        }
        joined = &mut relay_task => {
            match joined {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        match outcome.result {
                            Ok(reason) => info!(server = %outcome.server, "Relay ended: {:?}", reason),
                            Err(e) => error!(server = %outcome.server, "Relay failed: {}", e),
                        }
                    }
                }
                Err(e) => error!("Relay supervisor panicked: {}", e),
            }
            warn!("All relays stopped - shutting down");
        }
        joined = &mut discord_task => {
            match joined {
                Ok(Ok(())) => warn!("Discord client stopped - shutting down"),
                Ok(Err(e)) => error!("Discord client failed: {}", e),
                Err(e) => error!("Discord task panicked: {}", e),
            }
        }
    }

    // Handle graceful shutdown
    cancel.cancel();
    let timeout = Duration::from_secs(5);
    let drain = async {
        if !relay_task.is_finished() {
            if let Err(e) = relay_task.await {
                warn!("Relay supervisor panicked: {}", e);
            }
        }
        if !discord_task.is_finished() {
            if let Err(e) = discord_task.await {
                warn!("Discord task panicked: {}", e);
            }
        }
    };
    match tokio::time::timeout(timeout, drain).await {
        Ok(()) => info!("Relays disconnected gracefully"),
        Err(_) => warn!("Shutdown timed out"),
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
