//! Relay that pumps messages between one console and one chat destination.
//!
//! A relay owns its console session outright. While running, the console is
//! split into read and write halves: the game -> chat pump only reads and the
//! chat -> game pump only writes, so neither half needs a lock.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::common::RelayError;
use crate::game::classifier::{Classifier, Dialect};
use crate::game::formatter::{FormatContext, MessageFormatter};
use crate::protocol::econ::{ConsoleReader, ConsoleSession, ConsoleWriter};

use super::channels::RelaySide;
use super::filter::{FilterDirection, MessageFilter};

/// Lifecycle of a relay. It only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Connecting,
    Running,
    Stopped,
}

/// Why a relay stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation token fired.
    Cancelled,
    /// The server closed the console stream.
    RemoteClosed,
    /// Nothing can send chat messages to this relay any more.
    InboundClosed,
}

/// Bidirectional pump for one console session.
pub struct Relay {
    name: String,
    display_name: Option<String>,
    session: ConsoleSession,
    dialect: Dialect,
    classifier: Arc<Classifier>,
    formatter: MessageFormatter,
    filter: Arc<MessageFilter>,
    channels: RelaySide,
    state: RelayState,
    reached_running: bool,
}

impl Relay {
    /// Create an idle relay. `name` is the server's configured key.
    pub fn new(
        name: impl Into<String>,
        session: ConsoleSession,
        dialect: Dialect,
        classifier: Arc<Classifier>,
        channels: RelaySide,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            session,
            dialect,
            classifier,
            formatter: MessageFormatter::game_to_chat_default(),
            filter: Arc::new(MessageFilter::empty()),
            channels,
            state: RelayState::Idle,
            reached_running: false,
        }
    }

    /// Name shown for `%server`, taking precedence over the announced one.
    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        self.display_name = display_name;
        self
    }

    /// Format applied to game events before they go to chat.
    pub fn with_formatter(mut self, formatter: MessageFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_filter(mut self, filter: Arc<MessageFilter>) -> Self {
        self.filter = filter;
        self
    }

    #[allow(dead_code)]
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Whether this relay got past the handshake at some point.
    pub fn reached_running(&self) -> bool {
        self.reached_running
    }

    #[allow(dead_code)]
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Name used for `%server`: display name, else announced name, else key.
    pub fn server_label(&self) -> String {
        self.display_name
            .as_deref()
            .or(self.session.server_name())
            .unwrap_or(&self.name)
            .to_string()
    }

    /// Connect, then pump both directions until cancellation or failure.
    ///
    /// The session is disconnected exactly once before this returns, and
    /// nothing is read or written through it afterwards. A relay runs at
    /// most once; build a new one to reconnect.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<StopReason, RelayError> {
        if self.state != RelayState::Idle {
            return Err(RelayError::AlreadyStarted);
        }

        self.state = RelayState::Connecting;
        info!(server = %self.name, "Connecting relay to {}", self.session.address());

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.session.connect() => Some(result),
        };
        match connected {
            None => {
                // Dropping the connect future dropped any half-open stream.
                self.state = RelayState::Stopped;
                info!(server = %self.name, "Relay cancelled while connecting");
                return Ok(StopReason::Cancelled);
            }
            Some(Err(e)) => {
                self.state = RelayState::Stopped;
                warn!(server = %self.name, "Relay failed to connect: {}", e);
                return Err(e.into());
            }
            Some(Ok(())) => {}
        }

        self.state = RelayState::Running;
        self.reached_running = true;
        let label = self.server_label();
        info!(server = %self.name, dialect = %self.dialect, "Relay running as '{}'", label);

        let outcome = match self.session.split() {
            Ok((reader, writer)) => {
                let game_to_chat = game_to_chat(
                    reader,
                    EventContext {
                        name: &self.name,
                        label: &label,
                        dialect: self.dialect,
                        classifier: &self.classifier,
                        formatter: &self.formatter,
                        filter: &self.filter,
                    },
                    &self.channels.outbound_tx,
                );
                let chat_to_game = chat_to_game(
                    writer,
                    &self.name,
                    &self.filter,
                    &mut self.channels.inbound_rx,
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Ok(StopReason::Cancelled),
                    result = game_to_chat => result,
                    result = chat_to_game => result,
                }
            }
            Err(e) => Err(e.into()),
        };

        // Both pumps are gone by now; this is the only disconnect.
        if self.session.is_connected() {
            if let Err(e) = self.session.disconnect().await {
                debug!(server = %self.name, "Disconnect after relay stop failed: {}", e);
            }
        }
        self.state = RelayState::Stopped;

        match &outcome {
            Ok(reason) => info!(server = %self.name, "Relay stopped: {:?}", reason),
            Err(e) => warn!(server = %self.name, "Relay stopped with error: {}", e),
        }
        outcome
    }
}

/// Borrowed state the game -> chat pump needs per line.
struct EventContext<'a> {
    name: &'a str,
    label: &'a str,
    dialect: Dialect,
    classifier: &'a Classifier,
    formatter: &'a MessageFormatter,
    filter: &'a MessageFilter,
}

async fn game_to_chat(
    mut reader: ConsoleReader<'_>,
    ctx: EventContext<'_>,
    outbound: &mpsc::UnboundedSender<String>,
) -> Result<StopReason, RelayError> {
    loop {
        let line = match reader.read_line().await? {
            Some(line) => line,
            None => {
                info!(server = %ctx.name, "Console closed the connection");
                return Ok(StopReason::RemoteClosed);
            }
        };
        if line.is_empty() {
            continue;
        }
        trace!(server = %ctx.name, "console: {}", line);

        let Some(event) = ctx.classifier.classify(ctx.dialect, &line) else {
            continue;
        };
        if ctx.filter.should_filter(FilterDirection::GameToChat, &event) {
            debug!(server = %ctx.name, "Filtered game event: {}", event);
            continue;
        }

        let text = ctx
            .formatter
            .format(&FormatContext::new(event).with_server(ctx.label));
        outbound
            .send(text)
            .map_err(|_| RelayError::OutboundClosed)?;
    }
}

async fn chat_to_game(
    mut writer: ConsoleWriter<'_>,
    name: &str,
    filter: &MessageFilter,
    inbound: &mut mpsc::UnboundedReceiver<String>,
) -> Result<StopReason, RelayError> {
    while let Some(message) = inbound.recv().await {
        if filter.should_filter(FilterDirection::ChatToGame, &message) {
            debug!(server = %name, "Filtered chat message: {}", message);
            continue;
        }
        writer.send(&message).await?;
    }
    info!(server = %name, "Inbound queue closed");
    Ok(StopReason::InboundClosed)
}
