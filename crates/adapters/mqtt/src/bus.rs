//! Bus client: one broker connection shared by the inbound and outbound
//! paths.

use std::future::Future;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::mpsc;

use udin2mqtt_app::ports::{InboundMessage, OutboundMessage};
use udin2mqtt_domain::topic;

use crate::config::MqttConfig;
use crate::error::MqttError;

/// Availability payload published while the bridge is up.
pub const ONLINE: &str = "online";
/// Availability payload published on shutdown and registered as last will.
pub const OFFLINE: &str = "offline";

const REQUEST_CAPACITY: usize = 64;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// MQTT bus client for one bridge prefix.
#[derive(Debug, Clone)]
pub struct MqttBus {
    config: MqttConfig,
    availability_topic: String,
    command_filter: String,
}

impl MqttBus {
    pub fn new(config: MqttConfig, bridge_topic: &str) -> Self {
        Self {
            config,
            availability_topic: topic::availability_topic(bridge_topic),
            command_filter: topic::command_filter(bridge_topic),
        }
    }

    /// Connection options, with a retained `offline` last will on the
    /// availability topic.
    #[must_use]
    pub fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            &self.config.client_id,
            &self.config.broker_host,
            self.config.broker_port,
        );
        options.set_keep_alive(self.config.keep_alive());
        options.set_last_will(LastWill::new(
            &self.availability_topic,
            OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));
        options
    }

    /// Run until `shutdown` completes or the outbound channel closes.
    ///
    /// Inbound publishes on the command filter are forwarded to `inbound`;
    /// everything received on `outbound` is published at QoS 1. Connection
    /// errors are logged and retried after the configured delay. On a clean
    /// stop, `offline` is published before disconnecting.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if a request cannot be queued, and
    /// [`MqttError::Task`] if the connection task dies.
    pub async fn run(
        self,
        inbound: mpsc::Sender<InboundMessage>,
        mut outbound: mpsc::Receiver<OutboundMessage>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), MqttError> {
        let (client, eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        tracing::info!(
            broker = %self.config.broker_host,
            port = self.config.broker_port,
            client_id = %self.config.client_id,
            "starting MQTT client"
        );
        let session = Session {
            client: client.clone(),
            availability_topic: self.availability_topic.clone(),
            command_filter: self.command_filter.clone(),
            retry_delay: self.config.connect_retry_delay(),
        };
        let mut connection = tokio::spawn(session.drive(eventloop, inbound));
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                result = &mut connection => {
                    tracing::info!("MQTT connection task finished");
                    return result.map_err(MqttError::Task);
                }
                message = outbound.recv() => match message {
                    Some(message) => publish(&client, message).await?,
                    None => break,
                },
            }
        }

        tracing::info!("publishing offline and disconnecting");
        client
            .publish(&self.availability_topic, QoS::AtLeastOnce, true, OFFLINE)
            .await
            .map_err(MqttError::Client)?;
        client.disconnect().await.map_err(MqttError::Client)?;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut connection)
            .await
            .is_err()
        {
            tracing::warn!("MQTT connection did not close in time");
            connection.abort();
        }
        Ok(())
    }
}

async fn publish(client: &AsyncClient, message: OutboundMessage) -> Result<(), MqttError> {
    tracing::debug!(topic = %message.topic, retain = message.retain, "publishing");
    client
        .publish(message.topic, QoS::AtLeastOnce, message.retain, message.payload)
        .await
        .map_err(MqttError::Client)
}

/// What the connection task does after an event.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// State owned by the connection task.
struct Session {
    client: AsyncClient,
    availability_topic: String,
    command_filter: String,
    retry_delay: Duration,
}

impl Session {
    async fn drive(self, mut eventloop: EventLoop, inbound: mpsc::Sender<InboundMessage>) {
        loop {
            match eventloop.poll().await {
                Ok(event) => {
                    if self.handle(event, &inbound).await == Flow::Stop {
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, retry_in = ?self.retry_delay, "MQTT connection error");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn handle(&self, event: Event, inbound: &mpsc::Sender<InboundMessage>) -> Flow {
        match event {
            Event::Incoming(Packet::ConnAck(_)) => {
                self.on_connected();
                Flow::Continue
            }
            Event::Incoming(Packet::Publish(publish)) => {
                let message = InboundMessage::new(publish.topic.to_string(), publish.payload.to_vec());
                tracing::debug!(topic = %message.topic, "received command");
                if inbound.send(message).await.is_err() {
                    tracing::debug!("inbound channel closed");
                    return Flow::Stop;
                }
                Flow::Continue
            }
            Event::Outgoing(Outgoing::Disconnect) => {
                tracing::info!("disconnected from broker");
                Flow::Stop
            }
            _ => Flow::Continue,
        }
    }

    /// Subscriptions and availability do not survive a reconnect with a
    /// clean session, so both are renewed on every ConnAck.
    fn on_connected(&self) {
        tracing::info!(filter = %self.command_filter, "connected to broker");
        if let Err(err) = self
            .client
            .try_subscribe(&self.command_filter, QoS::AtLeastOnce)
        {
            tracing::warn!(error = %err, "failed to subscribe to commands");
        }
        if let Err(err) =
            self.client
                .try_publish(&self.availability_topic, QoS::AtLeastOnce, true, ONLINE)
        {
            tracing::warn!(error = %err, "failed to publish availability");
        }
    }
}
