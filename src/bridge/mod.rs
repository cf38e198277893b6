//! Relaying between game consoles and chat.
//!
//! ## Module Structure
//!
//! - `channels`: The per-relay outbound/inbound queue pair
//! - `filter`: Regex block-lists per direction
//! - `gateway`: The `ChatGateway` boundary to the chat platform
//! - `orchestrator`: The `Relay` pumping one console in both directions
//! - `registry`: Fan-out of chat messages to subscribed relays
//! - `supervisor`: One relay per server, with restarts

pub mod channels;
pub mod filter;
pub mod gateway;
pub mod orchestrator;
pub mod registry;
pub mod supervisor;

pub use filter::MessageFilter;
pub use gateway::ChatGateway;
pub use registry::SubscriberRegistry;
pub use supervisor::{RelayTemplate, RestartPolicy, Supervisor};
