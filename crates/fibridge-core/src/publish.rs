// MQTT sink
//
// One broker connection established at startup and reused for every
// cycle. The publish seam is a trait so the cycle logic can be exercised
// without a broker.

use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::BridgeError;

/// Outbound message sink for publish cycles.
#[async_trait]
pub trait Publish: Send + Sync {
    /// Publish a UTF-8 payload to the given topic.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BridgeError>;
}

/// `Publish` implementation over a rumqttc client.
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Connect to the broker named by `broker_url` (e.g.
    /// "mqtt://localhost:1883").
    ///
    /// Returns the publisher plus the event loop that must be driven for
    /// the connection to make progress -- pass it to
    /// [`spawn_event_loop`](Self::spawn_event_loop).
    pub fn connect(broker_url: &str, client_id: &str) -> Result<(Self, EventLoop), BridgeError> {
        let url: Url = broker_url.parse().map_err(|e: url::ParseError| {
            BridgeError::BrokerUrl {
                url: broker_url.into(),
                reason: e.to_string(),
            }
        })?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| BridgeError::BrokerUrl {
                url: broker_url.into(),
                reason: "URL has no host".into(),
            })?;
        let port = url.port().unwrap_or(1883);

        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(std::time::Duration::from_secs(30));

        let (client, event_loop) = AsyncClient::new(options, 10);
        Ok((Self { client }, event_loop))
    }

    /// Drive the broker connection on a background task until cancelled.
    ///
    /// Poll errors are logged and polling continues; rumqttc re-dials on
    /// the next poll.
    pub fn spawn_event_loop(
        mut event_loop: EventLoop,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    event = event_loop.poll() => match event {
                        Ok(event) => debug!(?event, "mqtt event"),
                        Err(e) => {
                            warn!(error = %e, "mqtt event loop error");
                            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Publish for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BridgeError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload.as_bytes().to_vec())
            .await
            .map_err(|e| BridgeError::Publish(e.to_string()))
    }
}
