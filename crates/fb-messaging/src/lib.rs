use fb_core::{CorrelationId, EpochMillis, MessageId, now_epoch_millis};
use serde::{Deserialize, Serialize};

mod backoff;
pub mod payloads;
mod zmq_transport;

pub use backoff::Backoff;
pub use zmq_transport::{
    MessagingError, SocketSettings, ZmqPublisher, ZmqPublisherConfig, ZmqSubscriber,
    ZmqSubscriberConfig,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub message_id: MessageId,
    #[serde(default)]
    pub correlation_id: Option<CorrelationId>,
    pub sent_at_ms: EpochMillis,
    pub source_service: String,
    #[serde(default)]
    pub schema: Option<String>,
}

impl MessageMetadata {
    pub fn new(source_service: impl Into<String>) -> Self {
        Self {
            message_id: MessageId::new(),
            correlation_id: None,
            sent_at_ms: now_epoch_millis(),
            source_service: source_service.into(),
            schema: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub metadata: MessageMetadata,
    pub payload: T,
}

impl<T> MessageEnvelope<T> {
    pub fn new(source_service: impl Into<String>, payload: T) -> Self {
        Self {
            metadata: MessageMetadata::new(source_service),
            payload,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.metadata.schema = Some(schema.into());
        self
    }
}
