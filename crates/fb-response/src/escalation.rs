use fb_core::{
    EscalationEvent, EscalationEventId, MissionId, MissionOutcome, MissionStatus, ResponseTier,
    ThreatLevel, TieredResponseMission, TriggerType, now_epoch_millis,
};
use fb_messaging::payloads::VerificationData;
use fb_observability::{ACTIVE_MISSIONS, ESCALATIONS_TOTAL, MISSIONS_FAILED_TOTAL};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::EscalationError;
use crate::orchestrator::Orchestrator;
use crate::planner;

pub const REASON_TIME_THRESHOLD: &str = "time_threshold_exceeded";
pub const REASON_FIRE_SIZE: &str = "fire_size_exceeded";
pub const REASON_CRITICAL_THREAT: &str = "critical_threat_level";
pub const REASON_VERIFICATION: &str = "verification_recommended_escalation";
pub const REASON_NOT_CONFIRMED: &str = "fire_not_confirmed";

/// Statuses a mission may escalate from. A completed mission can still be superseded when its
/// outcome recommends escalation.
fn escalatable(status: MissionStatus) -> bool {
    status.is_active() || status == MissionStatus::Completed
}

/// Completion or failure can land while the child is with the backend. Only a completion that
/// itself asked for escalation still wants the child.
fn superseded_during_dispatch(parent: &TieredResponseMission) -> bool {
    match parent.status {
        MissionStatus::Failed => true,
        MissionStatus::Completed => !parent
            .outcome
            .as_ref()
            .is_some_and(|outcome| outcome.recommend_escalation),
        _ => false,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum VerificationOutcome {
    StoodDown,
    Escalated { event: EscalationEvent },
    /// Escalation was warranted but the mission is already at the highest tier.
    AtHighestTier { reason: String },
    Monitoring,
    Ignored { status: MissionStatus },
}

impl Orchestrator {
    /// Creates and dispatches a child mission at `to_tier` for `mission_id`. The parent is only
    /// touched after the child is issued; a failed child dispatch leaves it as it was.
    pub async fn escalate(
        &self,
        mission_id: MissionId,
        to_tier: u8,
        reason: &str,
        trigger_type: TriggerType,
        trigger_data: Value,
    ) -> Result<EscalationEvent, EscalationError> {
        let child = {
            let mut state = self.lock().await;
            let parent = state
                .missions
                .get(&mission_id)
                .ok_or(EscalationError::NotFound(mission_id))?;
            let from = parent.tier;
            let to = ResponseTier::try_from(to_tier)
                .ok()
                .filter(|to| *to > from)
                .ok_or(EscalationError::NotUpward { from, to: to_tier })?;
            if !escalatable(parent.status) {
                return Err(EscalationError::NotEscalatable {
                    mission_id,
                    status: parent.status,
                });
            }
            let child = planner::escalated_mission(&self.inner.config, parent, to, now_epoch_millis());
            if !state.escalating.insert(mission_id) {
                return Err(EscalationError::InFlight(mission_id));
            }
            child
        };
        info!(
            mission_id = %mission_id,
            child_id = %child.id,
            to_tier = %child.tier,
            reason,
            "Escalating mission"
        );
        let dispatched = self.dispatch_mission(child, Some(mission_id)).await;

        let mut state = self.lock().await;
        state.escalating.remove(&mission_id);
        let child_id = dispatched?;

        let now = now_epoch_millis();
        let Some(parent) = state.missions.get_mut(&mission_id) else {
            return Err(EscalationError::NotFound(mission_id));
        };
        if superseded_during_dispatch(parent) {
            let status = parent.status;
            warn!(
                mission_id = %mission_id,
                child_id = %child_id,
                status = status.as_str(),
                "Parent finished during child dispatch; standing child down"
            );
            if state.fail(child_id, now) {
                if let Some(child) = state.missions.get(&child_id) {
                    self.publish(child);
                }
            }
            metrics::counter!(MISSIONS_FAILED_TOTAL, "cause" => "superseded").increment(1);
            metrics::gauge!(ACTIVE_MISSIONS).set(state.active_count() as f64);
            return Err(EscalationError::Superseded {
                mission_id,
                child_id,
                status,
            });
        }
        let from = parent.tier;
        parent.child_missions.push(child_id);
        parent.set_status(MissionStatus::Escalated, now);
        let to = state
            .missions
            .get(&child_id)
            .map(|child| child.tier)
            .unwrap_or(from);
        let released = state.stand_down_assets(mission_id);
        let event = EscalationEvent {
            id: EscalationEventId::new(),
            parent_mission_id: mission_id,
            child_mission_id: child_id,
            from_tier: from,
            to_tier: to,
            timestamp_ms: now,
            reason: reason.to_string(),
            trigger_type,
            trigger_data,
        };
        state.escalations.push(event.clone());
        state.stats.record_escalation();
        if let Some(parent) = state.missions.get(&mission_id) {
            self.publish(parent);
        }
        metrics::counter!(ESCALATIONS_TOTAL, "reason" => reason.to_string()).increment(1);
        metrics::gauge!(ACTIVE_MISSIONS).set(state.active_count() as f64);
        info!(
            mission_id = %mission_id,
            child_id = %child_id,
            from_tier = %from,
            to_tier = %to,
            released,
            "Mission escalated"
        );
        Ok(event)
    }

    /// Applies drone verification data: stands down unconfirmed fires and escalates confirmed
    /// ones that exceed the mission's triggers.
    pub async fn handle_verification(
        &self,
        data: VerificationData,
    ) -> Result<VerificationOutcome, EscalationError> {
        let mission_id = data.mission_id;
        let (tier, status, size_threshold) = {
            let mut state = self.lock().await;
            let mission = state
                .missions
                .get_mut(&mission_id)
                .ok_or(EscalationError::NotFound(mission_id))?;
            if let Some(refined) = data.refined_location.filter(|point| point.is_valid()) {
                mission.target_location = refined;
            }
            (
                mission.tier,
                mission.status,
                mission.escalation_triggers.size_threshold_m2,
            )
        };
        if status.is_terminal() {
            debug!(mission_id = %mission_id, status = status.as_str(), "Verification for finished mission");
            return Ok(VerificationOutcome::Ignored { status });
        }

        if !data.fire_confirmed {
            info!(mission_id = %mission_id, "Fire not confirmed; standing down");
            return match self
                .complete(mission_id, MissionOutcome::stand_down(REASON_NOT_CONFIRMED))
                .await
            {
                Ok(_) => Ok(VerificationOutcome::StoodDown),
                Err(err) => {
                    warn!(mission_id = %mission_id, error = %err, "Stand-down not applied");
                    Ok(VerificationOutcome::Ignored { status })
                }
            };
        }

        let threat = data
            .threat_assessment
            .current_threat_level
            .parse::<ThreatLevel>()
            .ok();
        let reason = if data.fire_size.estimated_area > size_threshold {
            Some(REASON_FIRE_SIZE)
        } else if threat == Some(ThreatLevel::Critical) {
            Some(REASON_CRITICAL_THREAT)
        } else if data.recommended_action.eq_ignore_ascii_case("escalate") {
            Some(REASON_VERIFICATION)
        } else {
            None
        };

        let Some(reason) = reason else {
            let mut state = self.lock().await;
            if let Some(mission) = state.missions.get_mut(&mission_id) {
                if matches!(mission.status, MissionStatus::Dispatched | MissionStatus::Active) {
                    mission.set_status(MissionStatus::OnScene, now_epoch_millis());
                    self.publish(mission);
                }
            }
            return Ok(VerificationOutcome::Monitoring);
        };

        let target = data
            .recommended_tier
            .and_then(|requested| ResponseTier::try_from(requested).ok())
            .filter(|requested| *requested > tier)
            .or_else(|| tier.next());
        let Some(target) = target else {
            warn!(mission_id = %mission_id, reason, "Escalation warranted but mission is at tier 3");
            return Ok(VerificationOutcome::AtHighestTier {
                reason: reason.to_string(),
            });
        };

        let trigger_data = json!({
            "source": "verification",
            "fireSize": data.fire_size.estimated_area,
            "sizeThreshold": size_threshold,
            "threatLevel": data.threat_assessment.current_threat_level,
            "recommendedAction": data.recommended_action,
            "confidence": data.confidence,
            "deviceId": data.device_id,
        });
        let event = self
            .escalate(
                mission_id,
                target.number(),
                reason,
                TriggerType::Automatic,
                trigger_data,
            )
            .await?;
        Ok(VerificationOutcome::Escalated { event })
    }

    /// Timer callback. Only missions still working the fire escalate; anything else means the
    /// timer lost a race with completion and is ignored.
    pub async fn handle_escalation_timeout(&self, mission_id: MissionId) {
        let (tier, threshold) = {
            let mut state = self.lock().await;
            state.timers.disarm_fired(mission_id);
            let Some(mission) = state.missions.get(&mission_id) else {
                return;
            };
            if !matches!(mission.status, MissionStatus::Active | MissionStatus::OnScene) {
                debug!(
                    mission_id = %mission_id,
                    status = mission.status.as_str(),
                    "Escalation timer fired for inactive mission"
                );
                return;
            }
            (mission.tier, mission.escalation_triggers.time_threshold_s)
        };
        let Some(next) = tier.next() else {
            warn!(mission_id = %mission_id, threshold_s = threshold, "Tier 3 response exceeded its time threshold");
            return;
        };
        let trigger_data = json!({ "source": "timer", "timeThresholdS": threshold });
        if let Err(err) = self
            .escalate(
                mission_id,
                next.number(),
                REASON_TIME_THRESHOLD,
                TriggerType::Automatic,
                trigger_data,
            )
            .await
        {
            warn!(mission_id = %mission_id, error = %err, "Timed escalation failed");
        }
    }
}
