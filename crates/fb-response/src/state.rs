use fb_config::OperationalLimits;
use fb_core::{
    AssetId, EpochMillis, EscalationEvent, FireDetectionEvent, FireEventId, MissionId,
    MissionStatus, ResponseTier, TieredResponseMission,
};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::registry::AssetRegistry;
use crate::status::PerformanceStats;
use crate::timers::EscalationTimers;

/// Everything guarded by the orchestrator lock. Methods here are synchronous; callers drop the
/// guard before any backend call.
#[derive(Debug, Default)]
pub struct ResponseState {
    pub missions: HashMap<MissionId, TieredResponseMission>,
    /// Escalation forest: every mission ever created for a fire, in creation order.
    pub by_fire: HashMap<FireEventId, Vec<MissionId>>,
    pub detections: HashMap<FireEventId, FireDetectionEvent>,
    pub registry: AssetRegistry,
    pub timers: EscalationTimers,
    /// Parents with a child dispatch in flight.
    pub escalating: HashSet<MissionId>,
    pub escalations: Vec<EscalationEvent>,
    pub stats: PerformanceStats,
    /// Policy-gate missions are not tracked as tiered responses, only their single asset.
    pub legacy: HashMap<MissionId, AssetId>,
}

impl ResponseState {
    pub fn new(registry: AssetRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn insert_mission(&mut self, mission: TieredResponseMission) {
        self.by_fire
            .entry(mission.fire_event_id)
            .or_default()
            .push(mission.id);
        self.missions.insert(mission.id, mission);
    }

    pub fn active_count(&self) -> usize {
        self.missions
            .values()
            .filter(|mission| mission.status.is_active())
            .count()
    }

    pub fn active_by_tier(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for mission in self.missions.values().filter(|m| m.status.is_active()) {
            *counts.entry(mission.tier.number()).or_default() += 1;
        }
        counts
    }

    /// Checks the operational limits for a new mission at `tier`. A parent being superseded by
    /// the new mission does not count against the limits.
    pub fn admit(
        &self,
        limits: &OperationalLimits,
        tier: ResponseTier,
        superseding: Option<MissionId>,
    ) -> Result<(), String> {
        if limits.emergency_override {
            return Ok(());
        }
        let active = self
            .missions
            .values()
            .filter(|mission| mission.status.is_active() && Some(mission.id) != superseding);
        let (total, tier3) = active.fold((0usize, 0usize), |(total, tier3), mission| {
            (
                total + 1,
                tier3 + usize::from(mission.tier == ResponseTier::Three),
            )
        });
        if total >= limits.max_concurrent_missions {
            return Err(format!(
                "{total} active missions at limit {}",
                limits.max_concurrent_missions
            ));
        }
        if tier == ResponseTier::Three && tier3 >= limits.max_tier3_missions {
            return Err(format!(
                "{tier3} active tier 3 missions at limit {}",
                limits.max_tier3_missions
            ));
        }
        Ok(())
    }

    /// Returns the mission's assets to the pool, clears its assignment and stops its timer.
    pub fn stand_down_assets(&mut self, mission_id: MissionId) -> usize {
        self.timers.cancel(mission_id);
        let Some(mission) = self.missions.get_mut(&mission_id) else {
            return 0;
        };
        let assets: Vec<AssetId> = std::mem::take(&mut mission.assigned_assets);
        self.registry.release(&assets, mission_id)
    }

    /// Marks a mission FAILED and releases whatever it holds. Returns false when the mission
    /// is unknown or already terminal.
    pub fn fail(&mut self, mission_id: MissionId, now_ms: EpochMillis) -> bool {
        match self.missions.get_mut(&mission_id) {
            Some(mission) if !mission.status.is_terminal() => {
                mission.set_status(MissionStatus::Failed, now_ms);
                mission.completed_at_ms = Some(now_ms);
            }
            _ => return false,
        }
        self.stand_down_assets(mission_id);
        self.stats.record_failure();
        true
    }

    pub fn bind_legacy(&mut self, mission_id: MissionId, asset_id: AssetId) {
        self.registry.bind(std::slice::from_ref(&asset_id), mission_id);
        self.legacy.insert(mission_id, asset_id);
    }

    /// Frees the asset held by a legacy mission. Returns false for ids that are not legacy.
    pub fn release_legacy(&mut self, mission_id: MissionId) -> bool {
        match self.legacy.remove(&mission_id) {
            Some(asset_id) => {
                self.registry.release(std::slice::from_ref(&asset_id), mission_id);
                true
            }
            None => false,
        }
    }

    pub fn active_missions(&self) -> Vec<TieredResponseMission> {
        let mut missions = self
            .missions
            .values()
            .filter(|mission| mission.status.is_active())
            .cloned()
            .collect::<Vec<_>>();
        missions.sort_by_key(|mission| (mission.created_at_ms, mission.tier));
        missions
    }

    pub fn missions_for_fire(&self, fire_event_id: FireEventId) -> Vec<TieredResponseMission> {
        self.by_fire
            .get(&fire_event_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.missions.get(id).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner;
    use crate::registry::default_fleet;
    use fb_config::TieredResponseConfig;
    use fb_core::{DetectionType, GeoPoint, ThreatLevel};

    fn mission(tier: ResponseTier, status: MissionStatus) -> TieredResponseMission {
        let detection = FireDetectionEvent {
            id: FireEventId::new(),
            device_id: "tower-1".to_string(),
            timestamp_ms: 0,
            location: GeoPoint::new(39.0, -120.0),
            confidence: 0.8,
            threat_level: ThreatLevel::High,
            detection_type: DetectionType::Smoke,
            source: "test".to_string(),
            estimated_area_m2: 100.0,
            weather: None,
        };
        let mut mission = planner::mission_for_detection(
            &TieredResponseConfig::default(),
            &detection,
            tier,
            0,
        );
        mission.status = status;
        mission
    }

    #[test]
    fn admission_counts_only_active_missions() {
        let limits = OperationalLimits {
            max_concurrent_missions: 2,
            max_tier3_missions: 1,
            emergency_override: false,
        };
        let mut state = ResponseState::default();
        state.insert_mission(mission(ResponseTier::One, MissionStatus::Completed));
        let active = mission(ResponseTier::Three, MissionStatus::Active);
        let active_id = active.id;
        state.insert_mission(active);
        assert!(state.admit(&limits, ResponseTier::One, None).is_ok());
        assert!(state.admit(&limits, ResponseTier::Three, None).is_err());
        assert!(state.admit(&limits, ResponseTier::Three, Some(active_id)).is_ok());

        state.insert_mission(mission(ResponseTier::One, MissionStatus::OnScene));
        assert!(state.admit(&limits, ResponseTier::One, None).is_err());

        let overridden = OperationalLimits {
            emergency_override: true,
            ..limits
        };
        assert!(state.admit(&overridden, ResponseTier::Three, None).is_ok());
    }

    #[test]
    fn fail_releases_assets_once() {
        let mut state =
            ResponseState::new(AssetRegistry::new(default_fleet(GeoPoint::new(0.0, 0.0))));
        let mut record = mission(ResponseTier::One, MissionStatus::Dispatched);
        let asset = AssetId::new("scout-1");
        state.registry.bind(std::slice::from_ref(&asset), record.id);
        record.assigned_assets = vec![asset.clone()];
        let id = record.id;
        state.insert_mission(record);

        assert!(state.fail(id, 5));
        assert!(!state.fail(id, 6));
        let mission = &state.missions[&id];
        assert_eq!(mission.status, MissionStatus::Failed);
        assert!(mission.assigned_assets.is_empty());
        assert_eq!(state.registry.get(&asset).unwrap().assigned_mission, None);
    }

    #[test]
    fn legacy_binding_holds_the_asset_until_released() {
        let mut state =
            ResponseState::new(AssetRegistry::new(default_fleet(GeoPoint::new(0.0, 0.0))));
        let mission_id = MissionId::new();
        let asset = AssetId::new("tanker-2");
        state.bind_legacy(mission_id, asset.clone());

        let bound = state.registry.get(&asset).unwrap();
        assert_eq!(bound.status, fb_core::AssetStatus::Mission);
        assert_eq!(bound.assigned_mission, Some(mission_id));

        assert!(state.release_legacy(mission_id));
        assert!(!state.release_legacy(mission_id));
        let released = state.registry.get(&asset).unwrap();
        assert_eq!(released.status, fb_core::AssetStatus::Online);
        assert_eq!(released.assigned_mission, None);
    }
}
