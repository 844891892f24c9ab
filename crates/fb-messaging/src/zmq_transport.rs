use crate::MessageEnvelope;
use serde::{Serialize, de::DeserializeOwned};
use std::env;
use thiserror::Error;

const DEFAULT_RECV_TIMEOUT_MS: i32 = 1_000;

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("zmq error: {0}")]
    Zmq(zmq::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("utf8 error: {0}")]
    Utf8(String),
    #[error("receive timed out")]
    Timeout,
}

impl MessagingError {
    /// Decode failures affect one message; transport failures need a fresh socket.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Zmq(_))
    }
}

impl From<zmq::Error> for MessagingError {
    fn from(value: zmq::Error) -> Self {
        match value {
            zmq::Error::EAGAIN => Self::Timeout,
            other => Self::Zmq(other),
        }
    }
}

/// Where a bus socket attaches and how it is tuned. Read from `{prefix}_ENDPOINT`,
/// `{prefix}_BIND`, `{prefix}_HWM` and `{prefix}_LINGER_MS`.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketSettings {
    pub endpoint: String,
    pub bind: bool,
    pub high_water_mark: Option<i32>,
    pub linger_ms: i32,
}

impl SocketSettings {
    fn from_env(prefix: &str, default_endpoint: &str) -> Self {
        Self {
            endpoint: env_string(prefix, "ENDPOINT").unwrap_or_else(|| default_endpoint.to_string()),
            bind: env_string(prefix, "BIND")
                .and_then(|value| parse_flag(&value))
                .unwrap_or(false),
            high_water_mark: env_parsed(prefix, "HWM"),
            linger_ms: env_parsed(prefix, "LINGER_MS").unwrap_or(0),
        }
    }

    fn attach(&self, socket: &zmq::Socket) -> Result<(), MessagingError> {
        socket.set_linger(self.linger_ms)?;
        if self.bind {
            socket.bind(&self.endpoint)?;
        } else {
            socket.connect(&self.endpoint)?;
        }
        Ok(())
    }
}

/// Outbound `mission_updates` socket (`FB_ZMQ_PUB_*`).
#[derive(Debug, Clone)]
pub struct ZmqPublisherConfig {
    pub socket: SocketSettings,
}

impl ZmqPublisherConfig {
    pub fn from_env(default_endpoint: &str) -> Self {
        Self {
            socket: SocketSettings::from_env("FB_ZMQ_PUB", default_endpoint),
        }
    }
}

/// Not `Sync`; share behind a mutex.
pub struct ZmqPublisher {
    socket: zmq::Socket,
}

impl ZmqPublisher {
    pub fn new(config: &ZmqPublisherConfig) -> Result<Self, MessagingError> {
        let socket = zmq::Context::new().socket(zmq::PUB)?;
        if let Some(hwm) = config.socket.high_water_mark {
            socket.set_sndhwm(hwm)?;
        }
        config.socket.attach(&socket)?;
        Ok(Self { socket })
    }

    /// Sends `[topic, json]` without blocking; a full queue drops the message.
    pub fn publish<T: Serialize>(
        &self,
        topic: &str,
        envelope: &MessageEnvelope<T>,
    ) -> Result<(), MessagingError> {
        let body = serde_json::to_vec(envelope)?;
        self.socket
            .send_multipart([topic.as_bytes(), body.as_slice()], zmq::DONTWAIT)?;
        Ok(())
    }
}

/// Inbound subscription (`FB_ZMQ_SUB_*`). An empty topic list subscribes to everything.
#[derive(Debug, Clone)]
pub struct ZmqSubscriberConfig {
    pub socket: SocketSettings,
    pub topics: Vec<String>,
    /// Bounds each blocking receive so the caller can observe shutdown.
    pub recv_timeout_ms: i32,
}

impl ZmqSubscriberConfig {
    pub fn from_env(default_endpoint: &str, topics: Vec<String>) -> Self {
        Self {
            socket: SocketSettings::from_env("FB_ZMQ_SUB", default_endpoint),
            topics,
            recv_timeout_ms: env_parsed("FB_ZMQ_SUB", "RECV_TIMEOUT_MS")
                .unwrap_or(DEFAULT_RECV_TIMEOUT_MS),
        }
    }
}

pub struct ZmqSubscriber {
    socket: zmq::Socket,
}

impl ZmqSubscriber {
    pub fn new(config: &ZmqSubscriberConfig) -> Result<Self, MessagingError> {
        let socket = zmq::Context::new().socket(zmq::SUB)?;
        if let Some(hwm) = config.socket.high_water_mark {
            socket.set_rcvhwm(hwm)?;
        }
        socket.set_rcvtimeo(config.recv_timeout_ms)?;
        config.socket.attach(&socket)?;
        if config.topics.is_empty() {
            socket.set_subscribe(b"")?;
        }
        for topic in &config.topics {
            socket.set_subscribe(topic.as_bytes())?;
        }
        Ok(Self { socket })
    }

    /// Blocks for the next `[topic, json]` message. Returns [`MessagingError::Timeout`] when
    /// nothing arrives within the receive timeout.
    pub fn recv<T: DeserializeOwned>(&self) -> Result<(String, MessageEnvelope<T>), MessagingError> {
        let frames = self.socket.recv_multipart(0)?;
        let [topic, body, ..] = frames.as_slice() else {
            return Err(MessagingError::InvalidFrame(format!(
                "expected topic and payload frames, got {}",
                frames.len()
            )));
        };
        let topic = std::str::from_utf8(topic)
            .map_err(|err| MessagingError::Utf8(err.to_string()))?
            .to_string();
        Ok((topic, serde_json::from_slice(body)?))
    }
}

fn env_string(prefix: &str, suffix: &str) -> Option<String> {
    env::var(format!("{prefix}_{suffix}")).ok()
}

fn env_parsed(prefix: &str, suffix: &str) -> Option<i32> {
    env_string(prefix, suffix).and_then(|value| value.trim().parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
