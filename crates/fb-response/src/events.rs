use fb_config::TopicConfig;
use fb_core::MissionId;
use fb_messaging::payloads::{
    AlertMessage, AssetTelemetry, MissionStatusMessage, TriangulationMessage, VerificationData,
};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::intake::InboundDetection;
use crate::orchestrator::Orchestrator;

#[derive(Debug)]
pub enum OrchestratorEvent {
    Detection(InboundDetection),
    Verification(VerificationData),
    MissionStatus(MissionStatusMessage),
    AssetTelemetry(AssetTelemetry),
    EscalationTimeout { mission_id: MissionId },
}

impl OrchestratorEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Detection(_) => "detection",
            Self::Verification(_) => "verification",
            Self::MissionStatus(_) => "mission_status",
            Self::AssetTelemetry(_) => "asset_telemetry",
            Self::EscalationTimeout { .. } => "escalation_timeout",
        }
    }
}

/// Maps a bus message onto an event by topic. Unknown topics yield `Ok(None)`.
pub fn decode(
    topics: &TopicConfig,
    topic: &str,
    payload: Value,
) -> Result<Option<OrchestratorEvent>, serde_json::Error> {
    let event = if topic == topics.alerts {
        OrchestratorEvent::Detection(InboundDetection::Alert(serde_json::from_value::<
            AlertMessage,
        >(payload)?))
    } else if topic == topics.triangulations {
        OrchestratorEvent::Detection(InboundDetection::Triangulation(serde_json::from_value::<
            TriangulationMessage,
        >(payload)?))
    } else if topic == topics.verification {
        OrchestratorEvent::Verification(serde_json::from_value(payload)?)
    } else if topic == topics.mission_status {
        OrchestratorEvent::MissionStatus(serde_json::from_value(payload)?)
    } else if topic == topics.asset_telemetry {
        OrchestratorEvent::AssetTelemetry(serde_json::from_value(payload)?)
    } else {
        return Ok(None);
    };
    Ok(Some(event))
}

/// Drains the event channel, handling each event on its own task so backend calls overlap.
/// Returns once every sender is gone.
pub async fn run(orchestrator: Orchestrator, mut events: UnboundedReceiver<OrchestratorEvent>) {
    info!("Orchestrator event loop started");
    while let Some(event) = events.recv().await {
        debug!(kind = event.kind(), "Event received");
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.handle_event(event).await;
        });
    }
    warn!("Orchestrator event loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn topics() -> TopicConfig {
        TopicConfig {
            alerts: "alerts".to_string(),
            triangulations: "triangulations".to_string(),
            verification: "verification".to_string(),
            mission_status: "mission_status".to_string(),
            asset_telemetry: "asset_telemetry".to_string(),
            mission_updates: "mission_updates".to_string(),
        }
    }

    #[test]
    fn decodes_by_topic() {
        let topics = topics();
        let alert = decode(
            &topics,
            "alerts",
            json!({"type": "smoke", "latitude": 1.0, "longitude": 2.0}),
        )
        .unwrap();
        assert!(matches!(
            alert,
            Some(OrchestratorEvent::Detection(InboundDetection::Alert(_)))
        ));

        let telemetry = decode(
            &topics,
            "asset_telemetry",
            json!({"assetId": "scout-1", "battery": 55.0}),
        )
        .unwrap();
        assert_eq!(telemetry.map(|event| event.kind()), Some("asset_telemetry"));

        assert!(decode(&topics, "video", json!({})).unwrap().is_none());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let topics = topics();
        assert!(decode(&topics, "mission_status", json!({"status": "active"})).is_err());
    }
}
