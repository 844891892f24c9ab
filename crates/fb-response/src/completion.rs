use fb_core::{
    EscalationEvent, MissionId, MissionOutcome, MissionStatus, TriggerType, elapsed_secs,
    now_epoch_millis,
};
use fb_messaging::payloads::{AssetTelemetry, MissionStatusMessage};
use fb_observability::{ACTIVE_MISSIONS, MISSIONS_COMPLETED_TOTAL, MISSIONS_FAILED_TOTAL};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::CompletionError;
use crate::orchestrator::Orchestrator;
use crate::status::CompletedResponse;

pub const REASON_COMPLETION: &str = "completion_recommended_escalation";

#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub mission_id: MissionId,
    pub actual_response_time_s: u64,
    pub met_target: bool,
    pub released_assets: usize,
    /// Follow-up mission raised because the outcome recommended escalation.
    pub escalation: Option<EscalationEvent>,
    pub escalation_error: Option<String>,
}

impl Orchestrator {
    /// Finalizes a mission and frees its assets. When the outcome recommends escalation and a
    /// higher tier exists, the follow-up mission is dispatched before this returns.
    pub async fn complete(
        &self,
        mission_id: MissionId,
        outcome: MissionOutcome,
    ) -> Result<CompletionReport, CompletionError> {
        let (report, follow_up) = {
            let mut state = self.lock().await;
            let mission = state
                .missions
                .get_mut(&mission_id)
                .ok_or(CompletionError::NotFound(mission_id))?;
            if mission.status.is_terminal() {
                return Err(CompletionError::AlreadyFinished {
                    mission_id,
                    status: mission.status,
                });
            }

            let now = now_epoch_millis();
            let response_time = elapsed_secs(mission.created_at_ms, now);
            let met_target = response_time <= mission.target_response_time_s;
            mission.set_status(MissionStatus::Completed, now);
            mission.completed_at_ms = Some(now);
            mission.actual_response_time_s = Some(response_time);
            mission.outcome = Some(outcome.clone());
            let tier = mission.tier;
            let follow_up = if outcome.recommend_escalation {
                match tier.next() {
                    Some(next) => Some(next),
                    None => {
                        warn!(mission_id = %mission_id, "Completion recommends escalation beyond tier 3");
                        None
                    }
                }
            } else {
                None
            };

            let released = state.stand_down_assets(mission_id);
            state.stats.record_completion(CompletedResponse {
                mission_id,
                tier,
                response_time_s: response_time,
                met_target,
                fire_contained: outcome.fire_contained,
            });
            if let Some(mission) = state.missions.get(&mission_id) {
                self.publish(mission);
            }
            metrics::counter!(MISSIONS_COMPLETED_TOTAL, "tier" => tier.to_string()).increment(1);
            metrics::gauge!(ACTIVE_MISSIONS).set(state.active_count() as f64);
            info!(
                mission_id = %mission_id,
                tier = %tier,
                response_time_s = response_time,
                contained = outcome.fire_contained,
                released,
                "Mission completed"
            );
            (
                CompletionReport {
                    mission_id,
                    actual_response_time_s: response_time,
                    met_target,
                    released_assets: released,
                    escalation: None,
                    escalation_error: None,
                },
                follow_up,
            )
        };

        let Some(next) = follow_up else {
            return Ok(report);
        };
        let reason = outcome
            .escalation_reason
            .clone()
            .filter(|reason| !reason.trim().is_empty())
            .unwrap_or_else(|| REASON_COMPLETION.to_string());
        let trigger_data = json!({
            "source": "completion",
            "fireContained": outcome.fire_contained,
            "suppressantUsed": outcome.suppressant_used_l,
        });
        match self
            .escalate(mission_id, next.number(), &reason, TriggerType::Automatic, trigger_data)
            .await
        {
            Ok(event) => Ok(CompletionReport {
                escalation: Some(event),
                ..report
            }),
            Err(err) => {
                warn!(mission_id = %mission_id, error = %err, "Escalation after completion failed");
                Ok(CompletionReport {
                    escalation_error: Some(err.to_string()),
                    ..report
                })
            }
        }
    }

    /// Applies a status transition reported by the backend.
    pub async fn handle_status(&self, message: MissionStatusMessage) -> Result<(), CompletionError> {
        let mission_id = message.mission_id;
        let Ok(status) = message.status.parse::<MissionStatus>() else {
            warn!(mission_id = %mission_id, status = %message.status, "Unknown mission status");
            return Ok(());
        };

        {
            let mut state = self.lock().await;
            if state.legacy.contains_key(&mission_id) {
                if matches!(status, MissionStatus::Completed | MissionStatus::Failed) {
                    state.release_legacy(mission_id);
                    info!(
                        mission_id = %mission_id,
                        status = status.as_str(),
                        "Legacy response finished; asset released"
                    );
                }
                return Ok(());
            }
        }

        match status {
            MissionStatus::Completed => {
                let outcome = message
                    .outcome
                    .map(MissionOutcome::from)
                    .unwrap_or(MissionOutcome {
                        fire_contained: true,
                        suppressant_used_l: None,
                        recommend_escalation: false,
                        escalation_reason: None,
                    });
                self.complete(mission_id, outcome).await.map(|_| ())
            }
            MissionStatus::Failed => {
                let mut state = self.lock().await;
                if !state.missions.contains_key(&mission_id) {
                    return Err(CompletionError::NotFound(mission_id));
                }
                if state.fail(mission_id, now_epoch_millis()) {
                    warn!(mission_id = %mission_id, "Backend reported mission failure");
                    if let Some(mission) = state.missions.get(&mission_id) {
                        self.publish(mission);
                    }
                    metrics::counter!(MISSIONS_FAILED_TOTAL, "cause" => "reported").increment(1);
                    metrics::gauge!(ACTIVE_MISSIONS).set(state.active_count() as f64);
                }
                Ok(())
            }
            MissionStatus::Dispatched | MissionStatus::Active | MissionStatus::OnScene => {
                let mut state = self.lock().await;
                let mission = state
                    .missions
                    .get_mut(&mission_id)
                    .ok_or(CompletionError::NotFound(mission_id))?;
                if !mission.status.is_active() {
                    debug!(
                        mission_id = %mission_id,
                        current = mission.status.as_str(),
                        reported = status.as_str(),
                        "Ignoring status for mission that is no longer active"
                    );
                    return Ok(());
                }
                if mission.status != status {
                    mission.set_status(status, now_epoch_millis());
                    self.publish(mission);
                }
                Ok(())
            }
            MissionStatus::Pending | MissionStatus::Escalated => {
                debug!(mission_id = %mission_id, status = status.as_str(), "Status owned by the orchestrator; ignored");
                Ok(())
            }
        }
    }

    pub async fn apply_telemetry(&self, telemetry: &AssetTelemetry) -> bool {
        self.lock().await.registry.apply_telemetry(telemetry)
    }
}
