//! MQTT-backed status sink.
//!
//! The connection is opened once at startup. A background task drives the
//! rumqttc event loop for the lifetime of the process. After every
//! reconnect it restores the status subscription, which a clean session
//! drops, and re-announces the sensor; it also re-announces whenever Home
//! Assistant comes back online. Reports are handed to the event loop
//! without waiting for delivery.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use pingwarden_monitor::{SinkError, SinkResult, StatusSink};

use crate::discovery::{HassConfig, Topics, sensor_discovery, state_payload};
use crate::error::{HassError, HassResult};
use crate::uri::MqttEndpoint;

/// How long to wait for the broker's CONNACK at startup.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Pause between event loop polls after a connection error.
const RETRY_DELAY: Duration = Duration::from_secs(1);
/// Capacity of the client request channel.
const REQUEST_CAPACITY: usize = 16;

/// Publishes health transitions as a Home Assistant binary sensor.
pub struct HassSink {
    client: AsyncClient,
    topics: Topics,
    driver: JoinHandle<()>,
}

impl HassSink {
    /// Connect to the broker, announce the sensor and start the event loop.
    pub async fn connect(config: &HassConfig) -> HassResult<Self> {
        let endpoint = MqttEndpoint::parse(&config.uri)?;
        let topics = Topics::new(&config.topic_prefix, &config.unique_id);

        let mut options = MqttOptions::new(&config.unique_id, &endpoint.host, endpoint.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let Some(username) = &endpoint.username {
            options.set_credentials(username, endpoint.password.as_deref().unwrap_or_default());
        } else if endpoint.vhost.is_some() {
            warn!("mqtt uri has a vhost but no username, vhost ignored");
        }

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        wait_for_connack(&mut eventloop).await?;
        info!(host = %endpoint.host, port = endpoint.port, "connected to mqtt broker");

        let discovery = serde_json::to_string(&sensor_discovery(config, &topics))?;
        client.subscribe(&topics.status, QoS::AtLeastOnce).await?;
        client
            .publish(&topics.config, QoS::AtLeastOnce, true, discovery.clone())
            .await?;
        debug!(topic = %topics.config, "published discovery document");

        let driver = tokio::spawn(drive(eventloop, client.clone(), topics.clone(), discovery));

        Ok(Self::from_parts(client, topics, driver))
    }

    fn from_parts(client: AsyncClient, topics: Topics, driver: JoinHandle<()>) -> Self {
        Self {
            client,
            topics,
            driver,
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }
}

impl Drop for HassSink {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[async_trait]
impl StatusSink for HassSink {
    async fn report(&mut self, healthy: bool) -> SinkResult<()> {
        let payload = state_payload(healthy).map_err(|e| SinkError::Encode(e.to_string()))?;
        self.client
            .try_publish(&self.topics.state, QoS::AtLeastOnce, true, payload)
            .map_err(|e| SinkError::Publish(e.to_string()))?;
        debug!(topic = %self.topics.state, healthy, "queued status report");
        Ok(())
    }
}

/// Poll until the broker acknowledges the connection.
async fn wait_for_connack(eventloop: &mut EventLoop) -> HassResult<()> {
    let connect = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                Ok(_) => continue,
                Err(e) => return Err(HassError::Connect(e.to_string())),
            }
        }
    };

    tokio::time::timeout(CONNECT_TIMEOUT, connect)
        .await
        .map_err(|_| HassError::ConnectTimeout(CONNECT_TIMEOUT))?
}

/// Follow-up the event loop owes the broker after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Publish the discovery document again.
    Announce,
    /// Re-subscribe to the status topic, then announce.
    Resubscribe,
}

/// Decide how to react to one event loop event.
fn on_event(event: &Event, topics: &Topics) -> Option<Action> {
    match event {
        Event::Incoming(Packet::ConnAck(_)) => Some(Action::Resubscribe),
        Event::Incoming(Packet::Publish(publish))
            if publish.topic == topics.status && publish.payload.as_ref() == b"online" =>
        {
            Some(Action::Announce)
        }
        _ => None,
    }
}

/// Carry out `action` without blocking the event loop.
fn apply(action: Action, client: &AsyncClient, topics: &Topics, discovery: &str) {
    if action == Action::Resubscribe {
        info!("reconnected to mqtt broker, restoring subscription");
        if let Err(e) = client.try_subscribe(&topics.status, QoS::AtLeastOnce) {
            error!(error = %e, topic = %topics.status, "failed to resubscribe");
        }
    } else {
        info!("home assistant came online, re-announcing sensor");
    }

    if let Err(e) = client.try_publish(&topics.config, QoS::AtLeastOnce, true, discovery) {
        error!(error = %e, "failed to re-announce sensor");
    }
}

/// Drive the event loop forever. The initial CONNACK was consumed by
/// `wait_for_connack`, so any CONNACK seen here follows a reconnect.
async fn drive(mut eventloop: EventLoop, client: AsyncClient, topics: Topics, discovery: String) {
    loop {
        match eventloop.poll().await {
            Ok(event) => {
                if let Some(action) = on_event(&event, &topics) {
                    apply(action, &client, &topics, &discovery);
                }
            }
            Err(e) => {
                error!(error = %e, "mqtt connection error");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}
