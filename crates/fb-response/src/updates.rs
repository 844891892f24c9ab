use fb_core::{
    AssetId, EpochMillis, FireDetectionEvent, MissionId, MissionPriority, MissionStatus,
    TieredResponseMission,
};
use fb_messaging::MessagingError;
use fb_messaging::payloads::{MissionUpdate, UpdateLocation};
use std::sync::Mutex;
use tracing::warn;

use crate::backend::LEGACY_MISSION_TYPE;
use crate::planner;

pub const AWAITING_CONFIRMATION: &str = "awaiting_confirmation";

/// Sink for console mission updates. Delivery is best effort.
pub trait UpdatePublisher: Send + Sync {
    fn publish(&self, update: &MissionUpdate) -> Result<(), MessagingError>;
}

/// Publisher used when no bus is configured.
#[derive(Debug, Default)]
pub struct DiscardPublisher;

impl UpdatePublisher for DiscardPublisher {
    fn publish(&self, _update: &MissionUpdate) -> Result<(), MessagingError> {
        Ok(())
    }
}

/// Keeps every published update in memory; used by the HTTP tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    updates: Mutex<Vec<MissionUpdate>>,
}

impl RecordingPublisher {
    pub fn updates(&self) -> Vec<MissionUpdate> {
        self.updates
            .lock()
            .map(|updates| updates.clone())
            .unwrap_or_default()
    }

    pub fn statuses_for(&self, mission_id: MissionId) -> Vec<String> {
        let id = mission_id.to_string();
        self.updates()
            .into_iter()
            .filter(|update| update.id == id)
            .map(|update| update.status)
            .collect()
    }
}

impl UpdatePublisher for RecordingPublisher {
    fn publish(&self, update: &MissionUpdate) -> Result<(), MessagingError> {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(update.clone());
        }
        Ok(())
    }
}

pub(crate) fn publish_best_effort(publisher: &dyn UpdatePublisher, update: &MissionUpdate) {
    if let Err(err) = publisher.publish(update) {
        warn!(mission_id = %update.id, status = %update.status, error = %err, "Mission update not published");
    }
}

pub fn mission_update(mission: &TieredResponseMission) -> MissionUpdate {
    MissionUpdate {
        id: mission.id.to_string(),
        mission_type: mission.mission_type(),
        status: mission.status.as_str().to_string(),
        priority: priority_label(mission.priority).to_string(),
        location: UpdateLocation {
            lat: mission.target_location.lat,
            lng: mission.target_location.lng,
            radius: mission.search_radius_m,
        },
        description: describe(mission),
        created_at: mission.created_at_ms,
        updated_at: mission.updated_at_ms,
        tier: Some(mission.tier.number()),
        assigned_assets: mission.assigned_assets.clone(),
    }
}

/// Update for a policy-gate mission, which has no tier and is not tracked locally.
pub fn legacy_update(
    mission_id: MissionId,
    detection: &FireDetectionEvent,
    status: &str,
    priority: MissionPriority,
    assets: Vec<AssetId>,
    now_ms: EpochMillis,
) -> MissionUpdate {
    MissionUpdate {
        id: mission_id.to_string(),
        mission_type: LEGACY_MISSION_TYPE.to_string(),
        status: status.to_string(),
        priority: priority_label(priority).to_string(),
        location: UpdateLocation {
            lat: detection.location.lat,
            lng: detection.location.lng,
            radius: planner::search_radius(detection.estimated_area_m2),
        },
        description: format!(
            "{} detection from {} at {:.0}% confidence",
            detection.source,
            detection.device_id,
            detection.confidence * 100.0
        ),
        created_at: now_ms,
        updated_at: now_ms,
        tier: None,
        assigned_assets: assets,
    }
}

fn priority_label(priority: MissionPriority) -> &'static str {
    match priority {
        MissionPriority::Low => "low",
        MissionPriority::Medium => "medium",
        MissionPriority::High => "high",
        MissionPriority::Critical => "critical",
    }
}

fn describe(mission: &TieredResponseMission) -> String {
    let tier = mission.tier.number();
    match mission.status {
        MissionStatus::Pending => format!("Tier {tier} response pending"),
        MissionStatus::Dispatched => format!(
            "Tier {tier} response dispatched with {} asset(s)",
            mission.assigned_assets.len()
        ),
        MissionStatus::Active => format!("Tier {tier} response en route"),
        MissionStatus::OnScene => format!("Tier {tier} response on scene"),
        MissionStatus::Completed => match &mission.outcome {
            Some(outcome) if outcome.fire_contained => format!("Tier {tier} response contained fire"),
            _ => format!("Tier {tier} response completed without containment"),
        },
        MissionStatus::Failed => format!("Tier {tier} response failed"),
        MissionStatus::Escalated => format!("Tier {tier} response escalated"),
    }
}
