//! The tiered response engine: intake, tier determination, asset allocation and dispatch.
//!
//! All mission, registry, timer and escalation bookkeeping lives behind one async mutex. The
//! guard is always dropped before the backend is called, so a slow backend never blocks intake
//! of unrelated fires.

use fb_config::{FeatureToggles, TieredResponseConfig};
use fb_core::{
    AssetId, AssetStatus, EscalationEvent, FireDetectionEvent, FireEventId, MissionId,
    MissionStatus, ResponseAsset, TieredResponseMission, now_epoch_millis,
};
use fb_observability::{
    ACTIVE_MISSIONS, DETECTIONS_TOTAL, MISSIONS_DISPATCHED_TOTAL, MISSIONS_FAILED_TOTAL,
};
use fb_policy::{CandidateAsset, EnvironmentReading, PolicyContext, PolicyEngine, PolicyGate};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::backend::{MissionBackend, MissionCreateRequest};
use crate::error::{BackendError, DispatchError};
use crate::events::OrchestratorEvent;
use crate::intake::{self, DedupFilter, InboundDetection};
use crate::planner;
use crate::registry::AssetRegistry;
use crate::state::ResponseState;
use crate::status::SystemStatus;
use crate::updates::{self, AWAITING_CONFIRMATION, UpdatePublisher};

/// Collaborators and settings injected at construction.
pub struct OrchestratorParts {
    pub config: TieredResponseConfig,
    pub toggles: FeatureToggles,
    pub fleet: Vec<ResponseAsset>,
    pub backend: Arc<dyn MissionBackend>,
    pub publisher: Arc<dyn UpdatePublisher>,
    pub dedup_capacity: usize,
}

/// What happened to a detection handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum DetectionOutcome {
    /// Missing or invalid coordinates.
    Rejected,
    Duplicate,
    Tiered { mission_id: MissionId },
    LegacyDenied { reasons: Vec<String> },
    LegacyAwaitingConfirmation { mission_id: MissionId },
    LegacyDispatched { mission_id: MissionId, asset_id: AssetId },
}

impl DetectionOutcome {
    pub fn mission_id(&self) -> Option<MissionId> {
        match self {
            Self::Tiered { mission_id } | Self::LegacyDispatched { mission_id, .. } => {
                Some(*mission_id)
            }
            _ => None,
        }
    }
}

pub(crate) struct Inner {
    pub(crate) config: TieredResponseConfig,
    pub(crate) toggles: FeatureToggles,
    pub(crate) gate: PolicyGate,
    pub(crate) backend: Arc<dyn MissionBackend>,
    pub(crate) publisher: Arc<dyn UpdatePublisher>,
    pub(crate) dedup: DedupFilter,
    pub(crate) state: Mutex<ResponseState>,
    pub(crate) events: UnboundedSender<OrchestratorEvent>,
    pub(crate) backend_reachable: AtomicBool,
}

#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) inner: Arc<Inner>,
}

impl Orchestrator {
    /// Builds the engine and the receiving end of its event channel; hand the receiver to
    /// [`crate::events::run`].
    pub fn new(parts: OrchestratorParts) -> (Self, UnboundedReceiver<OrchestratorEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let gate = PolicyGate::with_default_rules(parts.toggles.require_confirm);
        let inner = Inner {
            config: parts.config,
            toggles: parts.toggles,
            gate,
            backend: parts.backend,
            publisher: parts.publisher,
            dedup: DedupFilter::new(parts.dedup_capacity),
            state: Mutex::new(ResponseState::new(AssetRegistry::new(parts.fleet))),
            events,
            backend_reachable: AtomicBool::new(true),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            receiver,
        )
    }

    pub fn config(&self) -> &TieredResponseConfig {
        &self.inner.config
    }

    /// Sender for feeding bus messages into the event loop.
    pub fn event_sender(&self) -> UnboundedSender<OrchestratorEvent> {
        self.inner.events.clone()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, ResponseState> {
        self.inner.state.lock().await
    }

    pub(crate) fn publish(&self, mission: &TieredResponseMission) {
        updates::publish_best_effort(
            self.inner.publisher.as_ref(),
            &updates::mission_update(mission),
        );
    }

    pub async fn handle_event(&self, event: OrchestratorEvent) {
        match event {
            OrchestratorEvent::Detection(inbound) => {
                if let Err(err) = self.ingest(inbound).await {
                    warn!(error = %err, "Detection did not produce a mission");
                }
            }
            OrchestratorEvent::Verification(data) => {
                let mission_id = data.mission_id;
                if let Err(err) = self.handle_verification(data).await {
                    warn!(mission_id = %mission_id, error = %err, "Verification handling failed");
                }
            }
            OrchestratorEvent::MissionStatus(message) => {
                let mission_id = message.mission_id;
                if let Err(err) = self.handle_status(message).await {
                    warn!(mission_id = %mission_id, error = %err, "Status update not applied");
                }
            }
            OrchestratorEvent::AssetTelemetry(telemetry) => {
                self.apply_telemetry(&telemetry).await;
            }
            OrchestratorEvent::EscalationTimeout { mission_id } => {
                self.handle_escalation_timeout(mission_id).await;
            }
        }
    }

    /// Normalizes, deduplicates and processes an inbound detection.
    pub async fn ingest(&self, inbound: InboundDetection) -> Result<DetectionOutcome, DispatchError> {
        let Some(normalized) = intake::normalize(&inbound) else {
            metrics::counter!(DETECTIONS_TOTAL, "outcome" => "rejected").increment(1);
            return Ok(DetectionOutcome::Rejected);
        };
        if !self.inner.dedup.first_sighting(&normalized.dedup_key).await {
            metrics::counter!(DETECTIONS_TOTAL, "outcome" => "duplicate").increment(1);
            debug!(dedup_key = %normalized.dedup_key, "Dropping duplicate detection");
            return Ok(DetectionOutcome::Duplicate);
        }
        metrics::counter!(DETECTIONS_TOTAL, "outcome" => "accepted").increment(1);
        self.process_fire_detection(normalized.event).await
    }

    /// Opens a tier 1 response when the detection qualifies, otherwise falls back to the
    /// policy gate.
    pub async fn process_fire_detection(
        &self,
        detection: FireDetectionEvent,
    ) -> Result<DetectionOutcome, DispatchError> {
        info!(
            fire_event_id = %detection.id,
            device_id = %detection.device_id,
            confidence = detection.confidence,
            threat = ?detection.threat_level,
            "Processing fire detection"
        );
        self.lock()
            .await
            .detections
            .insert(detection.id, detection.clone());

        let tier = if self.inner.toggles.enable_tiered_response {
            planner::initial_tier(&self.inner.config, &detection)
        } else {
            None
        };
        let Some(tier) = tier else {
            return self.legacy_dispatch(&detection).await;
        };

        let mission =
            planner::mission_for_detection(&self.inner.config, &detection, tier, now_epoch_millis());
        let mission_id = self.dispatch_mission(mission, None).await?;
        Ok(DetectionOutcome::Tiered { mission_id })
    }

    /// Admits, staffs and issues `mission`. `superseding` names a parent that the mission will
    /// replace and is left out of the admission count.
    pub(crate) async fn dispatch_mission(
        &self,
        mut mission: TieredResponseMission,
        superseding: Option<MissionId>,
    ) -> Result<MissionId, DispatchError> {
        let mission_id = mission.id;
        let tier = mission.tier;
        let request = {
            let mut state = self.lock().await;
            if let Err(reason) = state.admit(&self.inner.config.limits, tier, superseding) {
                warn!(mission_id = %mission_id, tier = %tier, reason = %reason, "Mission not admitted");
                metrics::counter!(MISSIONS_FAILED_TOTAL, "cause" => "admission").increment(1);
                return Err(DispatchError::AdmissionRejected(reason));
            }

            let now = now_epoch_millis();
            let selected = state.registry.select(&self.inner.config.tier(tier).assets);
            if selected.is_empty() {
                mission.set_status(MissionStatus::Failed, now);
                mission.completed_at_ms = Some(now);
                warn!(mission_id = %mission_id, tier = %tier, "No qualifying assets; mission failed");
                self.publish(&mission);
                state.insert_mission(mission);
                state.stats.record_failure();
                metrics::counter!(MISSIONS_FAILED_TOTAL, "cause" => "no_assets").increment(1);
                return Err(DispatchError::NoQualifyingAssets { mission_id, tier });
            }

            state.registry.bind(&selected, mission_id);
            mission.primary_asset = selected.first().cloned();
            mission.assigned_assets = selected;
            mission.set_status(MissionStatus::Dispatched, now);
            mission.dispatched_at_ms = Some(now);
            let request = MissionCreateRequest::for_mission(&self.inner.config, &mission);
            self.publish(&mission);
            state.insert_mission(mission);
            state.stats.record_dispatch();
            metrics::gauge!(ACTIVE_MISSIONS).set(state.active_count() as f64);
            request
        };

        info!(
            mission_id = %mission_id,
            tier = %tier,
            assets = ?request.assigned_to,
            "Dispatching mission"
        );
        let created = self.inner.backend.create_mission(&request).await;
        self.inner.backend_reachable.store(
            !matches!(created, Err(BackendError::Unreachable(_))),
            Ordering::Relaxed,
        );

        let mut state = self.lock().await;
        match created {
            Ok(()) => {
                metrics::counter!(MISSIONS_DISPATCHED_TOTAL, "tier" => tier.to_string())
                    .increment(1);
                let threshold = state.missions.get(&mission_id).and_then(|mission| {
                    mission
                        .status
                        .is_active()
                        .then_some(mission.escalation_triggers.time_threshold_s)
                });
                if let Some(threshold) = threshold {
                    state.timers.arm(
                        mission_id,
                        Duration::from_secs(threshold),
                        self.inner.events.clone(),
                    );
                }
                Ok(mission_id)
            }
            Err(source) => {
                error!(mission_id = %mission_id, error = %source, "Backend rejected mission");
                if state.fail(mission_id, now_epoch_millis()) {
                    if let Some(mission) = state.missions.get(&mission_id) {
                        self.publish(mission);
                    }
                }
                metrics::counter!(MISSIONS_FAILED_TOTAL, "cause" => "backend").increment(1);
                metrics::gauge!(ACTIVE_MISSIONS).set(state.active_count() as f64);
                Err(DispatchError::Backend { mission_id, source })
            }
        }
    }

    /// Policy-gate fallback: a single-asset mission that is not tracked as a tiered response.
    /// The gate decision, candidate choice and binding share one critical section, so the
    /// chosen asset cannot be handed to another mission before the backend call.
    async fn legacy_dispatch(
        &self,
        detection: &FireDetectionEvent,
    ) -> Result<DetectionOutcome, DispatchError> {
        let mission_id = MissionId::new();
        let now = now_epoch_millis();
        let (priority, asset_id, request) = {
            let mut state = self.lock().await;
            let context = self.policy_context(&state, detection);
            let decision = self.inner.gate.evaluate(&context);
            if !decision.allow {
                info!(
                    fire_event_id = %detection.id,
                    reasons = ?decision.reasons,
                    "Policy gate denied response"
                );
                return Ok(DetectionOutcome::LegacyDenied {
                    reasons: decision.reasons,
                });
            }

            if decision.constraints.require_operator_confirm {
                info!(mission_id = %mission_id, "Response awaiting operator confirmation");
                updates::publish_best_effort(
                    self.inner.publisher.as_ref(),
                    &updates::legacy_update(
                        mission_id,
                        detection,
                        AWAITING_CONFIRMATION,
                        decision.priority,
                        Vec::new(),
                        now,
                    ),
                );
                return Ok(DetectionOutcome::LegacyAwaitingConfirmation { mission_id });
            }

            let Some(best) = context
                .candidates
                .into_iter()
                .filter(|candidate| candidate.link_ok)
                .max_by(|a, b| a.battery.total_cmp(&b.battery))
            else {
                return Ok(DetectionOutcome::LegacyDenied {
                    reasons: vec!["no linked candidate asset".to_string()],
                });
            };
            state.bind_legacy(mission_id, best.id.clone());
            let request = MissionCreateRequest::legacy(
                mission_id,
                detection,
                best.id.clone(),
                decision.priority,
                decision.constraints.max_altitude_m,
                self.inner.config.tier1.assets.max_flight_time_s,
            );
            (decision.priority, best.id, request)
        };

        info!(mission_id = %mission_id, asset_id = %asset_id, "Dispatching legacy response");
        let created = self.inner.backend.create_mission(&request).await;
        self.inner.backend_reachable.store(
            !matches!(created, Err(BackendError::Unreachable(_))),
            Ordering::Relaxed,
        );
        match created {
            Ok(()) => {
                metrics::counter!(MISSIONS_DISPATCHED_TOTAL, "tier" => "legacy").increment(1);
                updates::publish_best_effort(
                    self.inner.publisher.as_ref(),
                    &updates::legacy_update(
                        mission_id,
                        detection,
                        MissionStatus::Dispatched.as_str(),
                        priority,
                        vec![asset_id.clone()],
                        now,
                    ),
                );
                Ok(DetectionOutcome::LegacyDispatched {
                    mission_id,
                    asset_id,
                })
            }
            Err(source) => {
                error!(mission_id = %mission_id, error = %source, "Legacy dispatch failed");
                self.lock().await.release_legacy(mission_id);
                metrics::counter!(MISSIONS_FAILED_TOTAL, "cause" => "backend").increment(1);
                Err(DispatchError::Backend { mission_id, source })
            }
        }
    }

    /// Gate input built from the registry: online and offline assets are candidates, only
    /// online ones have a live link. Assets already on a mission are left out.
    fn policy_context(
        &self,
        state: &ResponseState,
        detection: &FireDetectionEvent,
    ) -> PolicyContext {
        PolicyContext {
            target: detection.location,
            confidence: detection.confidence,
            min_confidence: self.inner.toggles.min_confidence,
            environment: detection.weather.map(|weather| EnvironmentReading {
                wind_speed_mps: Some(weather.wind_speed),
                visibility_m: None,
            }),
            candidates: state
                .registry
                .list()
                .into_iter()
                .filter(|asset| matches!(asset.status, AssetStatus::Online | AssetStatus::Offline))
                .map(|asset| CandidateAsset {
                    link_ok: asset.status == AssetStatus::Online,
                    id: asset.id,
                    battery: asset.battery,
                })
                .collect(),
        }
    }

    pub async fn status(&self) -> SystemStatus {
        let dedup_keys = self.inner.dedup.len().await;
        let backend_reachable = self.inner.backend_reachable.load(Ordering::Relaxed);
        let state = self.lock().await;
        SystemStatus {
            tiered_response_enabled: self.inner.toggles.enable_tiered_response,
            active_missions: state.active_count(),
            active_by_tier: state.active_by_tier(),
            assets: state.registry.summary(),
            performance: state.stats.summary(&self.inner.config.targets),
            escalations: state.escalations.len(),
            armed_timers: state.timers.armed(),
            dedup_keys,
            backend_reachable,
            degraded: !backend_reachable,
        }
    }

    pub async fn active_missions(&self) -> Vec<TieredResponseMission> {
        self.lock().await.active_missions()
    }

    pub async fn mission(&self, mission_id: MissionId) -> Option<TieredResponseMission> {
        self.lock().await.missions.get(&mission_id).cloned()
    }

    /// Every mission raised for a fire, root first.
    pub async fn missions_for_fire(&self, fire_event_id: FireEventId) -> Vec<TieredResponseMission> {
        self.lock().await.missions_for_fire(fire_event_id)
    }

    pub async fn detection(&self, fire_event_id: FireEventId) -> Option<FireDetectionEvent> {
        self.lock().await.detections.get(&fire_event_id).cloned()
    }

    pub async fn escalations(&self) -> Vec<EscalationEvent> {
        self.lock().await.escalations.clone()
    }

    pub async fn assets(&self) -> Vec<ResponseAsset> {
        self.lock().await.registry.list()
    }

    pub async fn asset(&self, asset_id: &AssetId) -> Option<ResponseAsset> {
        self.lock().await.registry.get(asset_id).cloned()
    }

    pub async fn has_armed_timer(&self, mission_id: MissionId) -> bool {
        self.lock().await.timers.is_armed(mission_id)
    }
}
