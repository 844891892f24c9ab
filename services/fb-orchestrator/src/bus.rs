use fb_config::TopicConfig;
use fb_messaging::payloads::MissionUpdate;
use fb_messaging::{
    Backoff, MessageEnvelope, MessagingError, ZmqPublisher, ZmqSubscriber, ZmqSubscriberConfig,
};
use fb_observability::BUS_RECONNECTS_TOTAL;
use fb_response::{OrchestratorEvent, UpdatePublisher, events};
use serde_json::Value;
use std::io;
use std::sync::Arc;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

const MISSION_UPDATE_SCHEMA: &str = "mission_update.v1";

/// Publishes console updates on the `mission_updates` topic.
pub struct BusPublisher {
    publisher: Mutex<ZmqPublisher>,
    topic: String,
    source: String,
}

impl BusPublisher {
    pub fn new(publisher: ZmqPublisher, topic: String, source: String) -> Self {
        Self {
            publisher: Mutex::new(publisher),
            topic,
            source,
        }
    }
}

impl UpdatePublisher for BusPublisher {
    fn publish(&self, update: &MissionUpdate) -> Result<(), MessagingError> {
        let envelope =
            MessageEnvelope::new(self.source.clone(), update).with_schema(MISSION_UPDATE_SCHEMA);
        // Poisoning does not invalidate the socket.
        let publisher = self.publisher.lock().unwrap_or_else(PoisonError::into_inner);
        publisher.publish(&self.topic, &envelope)
    }
}

/// Runs the blocking subscriber on its own thread, reconnecting with exponential backoff, and
/// forwards decoded messages into the orchestrator's event channel.
pub fn spawn_subscriber(
    config: ZmqSubscriberConfig,
    topics: TopicConfig,
    sender: UnboundedSender<OrchestratorEvent>,
    shutdown: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("fb-bus-subscriber".to_string())
        .spawn(move || subscribe_loop(&config, &topics, &sender, &shutdown))
}

fn subscribe_loop(
    config: &ZmqSubscriberConfig,
    topics: &TopicConfig,
    sender: &UnboundedSender<OrchestratorEvent>,
    shutdown: &AtomicBool,
) {
    let mut backoff = Backoff::new(Duration::from_millis(250), Duration::from_secs(30));
    while !shutdown.load(Ordering::Relaxed) {
        let subscriber = match ZmqSubscriber::new(config) {
            Ok(subscriber) => {
                info!(endpoint = %config.socket.endpoint, topics = ?config.topics, "Bus subscriber connected");
                subscriber
            }
            Err(err) => {
                let delay = backoff.next_delay();
                warn!(
                    endpoint = %config.socket.endpoint,
                    error = %err,
                    attempt = backoff.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "Bus subscriber connect failed"
                );
                metrics::counter!(BUS_RECONNECTS_TOTAL).increment(1);
                thread::sleep(delay);
                continue;
            }
        };

        loop {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            match subscriber.recv::<Value>() {
                Ok((topic, envelope)) => {
                    backoff.reset();
                    match events::decode(topics, &topic, envelope.payload) {
                        Ok(Some(event)) => {
                            if sender.send(event).is_err() {
                                info!("Event loop closed; stopping bus subscriber");
                                return;
                            }
                        }
                        Ok(None) => debug!(topic = %topic, "Ignoring message on unhandled topic"),
                        Err(err) => warn!(topic = %topic, error = %err, "Dropping malformed message"),
                    }
                }
                Err(MessagingError::Timeout) => continue,
                Err(err) if err.is_transport() => {
                    let delay = backoff.next_delay();
                    warn!(error = %err, delay_ms = delay.as_millis() as u64, "Bus transport error; reconnecting");
                    metrics::counter!(BUS_RECONNECTS_TOTAL).increment(1);
                    thread::sleep(delay);
                    break;
                }
                Err(err) => warn!(error = %err, "Dropping undecodable bus frame"),
            }
        }
    }
}
