//! Relay channel management.
//!
//! Each relay talks to the chat side through exactly two FIFO queues:
//! game events going out to chat, and chat messages coming in to the game.

use tokio::sync::mpsc;

/// Ends held by the relay.
pub struct RelaySide {
    /// Sender for game -> chat events.
    pub outbound_tx: mpsc::UnboundedSender<String>,
    /// Receiver for chat -> game messages.
    pub inbound_rx: mpsc::UnboundedReceiver<String>,
}

/// Ends held by whatever wires the relay to the chat gateway.
pub struct GatewaySide {
    /// Receiver for game -> chat events.
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
    /// Sender for chat -> game messages.
    pub inbound_tx: mpsc::UnboundedSender<String>,
}

/// Both ends of one relay's channel pair.
pub struct RelayChannels {
    pub relay: RelaySide,
    pub gateway: GatewaySide,
}

impl RelayChannels {
    /// Create a fresh outbound/inbound queue pair.
    pub fn pair() -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        Self {
            relay: RelaySide {
                outbound_tx,
                inbound_rx,
            },
            gateway: GatewaySide {
                outbound_rx,
                inbound_tx,
            },
        }
    }
}
