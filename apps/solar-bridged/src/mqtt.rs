use publish_gate::Publication;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Thin wrapper over the rumqttc client: prefixes topics and publishes
/// fire-and-forget so the decode loop never waits on the broker. Network
/// housekeeping runs on a spawned event-loop task.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    prefix: String,
}

impl MqttPublisher {
    pub fn connect(
        host: &str,
        port: u16,
        credentials: Option<(&str, &str)>,
        client_id: &str,
        prefix: &str,
    ) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);
        if let Some((username, password)) = credentials {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(event) => debug!(?event, "mqtt event"),
                    Err(e) => {
                        error!(error = %e, "mqtt connection error");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        Self {
            client,
            prefix: prefix.to_string(),
        }
    }

    /// Fire-and-forget: a full queue or a dead connection drops the
    /// message with a warning. Staleness is bounded by the engine's
    /// heartbeats, not by delivery guarantees.
    pub fn publish(&self, publication: &Publication) {
        let topic = format!("{}/{}", self.prefix, publication.topic);
        if let Err(e) = self.client.try_publish(
            topic,
            QoS::AtMostOnce,
            publication.retain,
            publication.payload.clone(),
        ) {
            warn!(topic = %publication.topic, error = %e, "publish dropped");
        }
    }

    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            warn!(error = %e, "mqtt disconnect failed");
        }
    }
}
