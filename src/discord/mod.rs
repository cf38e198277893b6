//! Discord bot integration.
//!
//! This module provides the Discord side of the bridge: posting relay
//! events to channels and handing channel messages to the relays.

pub mod client;
pub mod commands;
pub mod gateway;
pub mod handler;
pub mod resolver;

// Re-export main types for external use
pub use client::DiscordBot;
pub use gateway::DiscordGateway;
pub use handler::BridgeHandler;
pub use resolver::MessageResolver;
