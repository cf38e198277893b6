//! Runs one relay per configured server and restarts them on failure.
//!
//! Every relay gets a forwarder task posting its events through the chat
//! gateway, and its inbound queue is registered under the server's name so
//! chat messages reach it. Each restart builds a brand-new relay and session.

use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::common::{ConfigError, Destination, RelayError};
use crate::config::types::{RelayConfig, ServerConfig};
use crate::game::classifier::{Classifier, Dialect};
use crate::game::formatter::MessageFormatter;
use crate::protocol::econ::{ConsoleOptions, ConsoleSession};

use super::channels::{GatewaySide, RelayChannels, RelaySide};
use super::filter::MessageFilter;
use super::gateway::ChatGateway;
use super::orchestrator::{Relay, StopReason};
use super::registry::SubscriberRegistry;

/// Everything needed to build a fresh relay for one server.
#[derive(Debug, Clone)]
pub struct RelayTemplate {
    pub name: String,
    pub display_name: Option<String>,
    pub options: ConsoleOptions,
    pub dialect: Dialect,
    pub destination: Destination,
    pub formatter: MessageFormatter,
}

impl RelayTemplate {
    pub fn from_config(server: &ServerConfig, relay: &RelayConfig) -> Result<Self, ConfigError> {
        let dialect = server
            .dialect
            .parse()
            .map_err(|message| ConfigError::InvalidValue {
                field: format!("servers.{}.dialect", server.name),
                message,
            })?;

        let mut options = ConsoleOptions::new(&server.host, server.port, server.password.clone());
        options.connect_timeout = relay.connect_timeout();
        options.banner_timeout = relay.banner_timeout();
        options.auth_timeout = relay.auth_timeout();
        options.drain_timeout = relay.drain_timeout();
        options.server_name_timeout = relay.server_name_timeout();
        options.query_server_name = relay.query_server_name();

        let format = server
            .game_to_chat_format
            .as_deref()
            .unwrap_or(relay.game_to_chat_format());

        Ok(Self {
            name: server.name.clone(),
            display_name: server.display_name.clone(),
            options,
            dialect,
            destination: server.channel,
            formatter: MessageFormatter::new(format),
        })
    }

    fn build(&self, shared: &Shared, channels: RelaySide) -> Relay {
        Relay::new(
            self.name.clone(),
            ConsoleSession::new(self.options.clone()),
            self.dialect,
            Arc::clone(&shared.classifier),
            channels,
        )
        .with_display_name(self.display_name.clone())
        .with_formatter(self.formatter.clone())
        .with_filter(Arc::clone(&shared.filter))
    }
}

/// When and how fast failed relays are restarted.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    pub enabled: bool,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Consecutive restarts before giving up. Unlimited when `None`.
    pub max_attempts: Option<usize>,
}

impl RestartPolicy {
    pub fn from_config(relay: &RelayConfig) -> Self {
        Self {
            enabled: relay.reconnect(),
            min_delay: relay.reconnect_min_delay(),
            max_delay: relay.reconnect_max_delay(),
            max_attempts: relay.reconnect_max_attempts,
        }
    }

    /// Jittered exponential delays between restarts.
    fn backoff(&self) -> impl Iterator<Item = Duration> {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_jitter();
        match self.max_attempts {
            Some(times) => builder.with_max_times(times),
            None => builder.without_max_times(),
        }
        .build()
    }
}

/// Final result of one server's supervision.
#[derive(Debug)]
pub struct RelayOutcome {
    pub server: String,
    pub result: Result<StopReason, RelayError>,
}

struct Shared {
    classifier: Arc<Classifier>,
    filter: Arc<MessageFilter>,
    registry: Arc<SubscriberRegistry>,
    gateway: Arc<dyn ChatGateway>,
    policy: RestartPolicy,
}

/// Owner of all relays.
pub struct Supervisor {
    templates: Vec<RelayTemplate>,
    shared: Arc<Shared>,
}

impl Supervisor {
    pub fn new(
        templates: Vec<RelayTemplate>,
        classifier: Arc<Classifier>,
        filter: Arc<MessageFilter>,
        registry: Arc<SubscriberRegistry>,
        gateway: Arc<dyn ChatGateway>,
        policy: RestartPolicy,
    ) -> Self {
        Self {
            templates,
            shared: Arc::new(Shared {
                classifier,
                filter,
                registry,
                gateway,
                policy,
            }),
        }
    }

    /// Run every relay until each has stopped for good or `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> Vec<RelayOutcome> {
        let mut tasks = JoinSet::new();
        for template in self.templates {
            tasks.spawn(supervise(
                template,
                Arc::clone(&self.shared),
                cancel.child_token(),
            ));
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Relay task failed: {}", e),
            }
        }
        outcomes
    }
}

async fn supervise(
    template: RelayTemplate,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) -> RelayOutcome {
    let name = template.name.clone();
    let mut backoff = shared.policy.backoff();

    loop {
        let RelayChannels { relay, gateway } = RelayChannels::pair();
        let GatewaySide {
            outbound_rx,
            inbound_tx,
        } = gateway;
        shared
            .registry
            .subscribe(name.clone(), template.destination, inbound_tx)
            .await;
        let forwarder = tokio::spawn(forward_to_chat(
            outbound_rx,
            Arc::clone(&shared.gateway),
            template.destination,
            name.clone(),
        ));

        let mut relay = template.build(&shared, relay);
        let result = relay.run(cancel.clone()).await;
        let reached_running = relay.reached_running();

        shared.registry.unsubscribe(&name).await;
        // Dropping the relay closes the outbound queue; the forwarder
        // delivers what is left and exits.
        drop(relay);
        if let Err(e) = forwarder.await {
            error!(server = %name, "Chat forwarder failed: {}", e);
        }

        let retry = match &result {
            Ok(StopReason::Cancelled) | Ok(StopReason::InboundClosed) => false,
            Ok(StopReason::RemoteClosed) => true,
            Err(e) if e.is_retryable() => true,
            Err(e) => {
                error!(server = %name, "Relay stopped permanently: {}", e);
                false
            }
        };
        if !retry || !shared.policy.enabled {
            return RelayOutcome {
                server: name,
                result,
            };
        }

        if reached_running {
            backoff = shared.policy.backoff();
        }
        let Some(delay) = backoff.next() else {
            error!(server = %name, "Giving up on relay after repeated failures");
            return RelayOutcome {
                server: name,
                result,
            };
        };
        info!(server = %name, "Restarting relay in {:.1} seconds...", delay.as_secs_f64());

        tokio::select! {
            _ = cancel.cancelled() => {
                return RelayOutcome {
                    server: name,
                    result: Ok(StopReason::Cancelled),
                };
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Post a relay's events to its chat destination in order.
async fn forward_to_chat(
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    gateway: Arc<dyn ChatGateway>,
    destination: Destination,
    server: String,
) {
    while let Some(text) = outbound_rx.recv().await {
        if let Err(e) = gateway.send(destination, &text).await {
            warn!(server = %server, "Failed to deliver event to chat: {}", e);
        }
    }
}
