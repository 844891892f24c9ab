use fb_config::TieredResponseConfig;
use fb_core::{
    EpochMillis, EscalationTriggers, FireDetectionEvent, FireEventId, GeoPoint, MissionId,
    MissionParams, MissionPriority, MissionStatus, ResponseTier, ThreatLevel,
    TieredResponseMission,
};
use fb_geo::{Waypoint, perimeter};

pub const MIN_SEARCH_RADIUS_M: f64 = 100.0;

/// Search radius scaled to the reported fire size, never below [`MIN_SEARCH_RADIUS_M`].
pub fn search_radius(estimated_area_m2: f64) -> f64 {
    (estimated_area_m2.max(0.0).sqrt() * 2.0).max(MIN_SEARCH_RADIUS_M)
}

/// Autonomous response always opens at tier 1; heavier tiers are reached by escalation only.
pub fn initial_tier(
    config: &TieredResponseConfig,
    detection: &FireDetectionEvent,
) -> Option<ResponseTier> {
    (detection.confidence >= config.tier1.thresholds.min_confidence).then_some(ResponseTier::One)
}

pub fn mission_for_detection(
    config: &TieredResponseConfig,
    detection: &FireDetectionEvent,
    tier: ResponseTier,
    now_ms: EpochMillis,
) -> TieredResponseMission {
    let priority = MissionPriority::from(detection.threat_level);
    new_mission(
        config,
        tier,
        priority,
        detection.threat_level == ThreatLevel::Critical,
        now_ms,
        MissionSeed {
            fire_event_id: detection.id,
            target_location: detection.location,
            search_radius_m: search_radius(detection.estimated_area_m2),
            parent_mission: None,
        },
    )
}

/// Child mission for `parent` at `tier`, sharing its fire event, target and priority.
pub fn escalated_mission(
    config: &TieredResponseConfig,
    parent: &TieredResponseMission,
    tier: ResponseTier,
    now_ms: EpochMillis,
) -> TieredResponseMission {
    new_mission(
        config,
        tier,
        parent.priority,
        parent.params.emergency_protocol || parent.priority == MissionPriority::Critical,
        now_ms,
        MissionSeed {
            fire_event_id: parent.fire_event_id,
            target_location: parent.target_location,
            search_radius_m: parent.search_radius_m,
            parent_mission: Some(parent.id),
        },
    )
}

struct MissionSeed {
    fire_event_id: FireEventId,
    target_location: GeoPoint,
    search_radius_m: f64,
    parent_mission: Option<MissionId>,
}

fn new_mission(
    config: &TieredResponseConfig,
    tier: ResponseTier,
    priority: MissionPriority,
    emergency: bool,
    now_ms: EpochMillis,
    seed: MissionSeed,
) -> TieredResponseMission {
    let policy = config.tier(tier);
    let suppression = tier >= ResponseTier::Two;
    TieredResponseMission {
        id: MissionId::new(),
        fire_event_id: seed.fire_event_id,
        tier,
        status: MissionStatus::Pending,
        priority,
        created_at_ms: now_ms,
        dispatched_at_ms: None,
        completed_at_ms: None,
        updated_at_ms: now_ms,
        target_location: seed.target_location,
        search_radius_m: seed.search_radius_m,
        assigned_assets: Vec::new(),
        primary_asset: None,
        params: MissionParams {
            max_flight_time_s: policy.assets.max_flight_time_s,
            suppressant_type: policy
                .assets
                .suppressant_type
                .clone()
                .filter(|_| suppression),
            suppressant_amount_l: policy.assets.suppressant_amount_l.filter(|_| suppression),
            return_to_base: true,
            emergency_protocol: emergency || tier == ResponseTier::Three,
        },
        target_response_time_s: config.response_target_s(tier),
        actual_response_time_s: None,
        escalation_triggers: EscalationTriggers {
            time_threshold_s: policy.thresholds.time_threshold_s,
            size_threshold_m2: policy.thresholds.size_threshold_m2,
            confidence_threshold: policy.thresholds.escalation_confidence,
        },
        outcome: None,
        parent_mission: seed.parent_mission,
        child_missions: Vec::new(),
    }
}

/// Tier 3 flies a containment ring around the target; lower tiers go straight to it.
pub fn waypoints(config: &TieredResponseConfig, mission: &TieredResponseMission) -> Vec<Waypoint> {
    let altitude = config.tier(mission.tier).assets.cruise_altitude_m;
    let mut points = vec![Waypoint::at(mission.target_location, altitude)];
    if mission.tier == ResponseTier::Three {
        let ring = mission.assigned_assets.len().max(4);
        points.extend(perimeter(
            mission.target_location,
            mission.search_radius_m,
            ring,
            altitude,
        ));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use fb_core::DetectionType;

    fn detection(confidence: f64, area: f64) -> FireDetectionEvent {
        FireDetectionEvent {
            id: FireEventId::new(),
            device_id: "tower-1".to_string(),
            timestamp_ms: 0,
            location: GeoPoint::new(37.0, -119.0),
            confidence,
            threat_level: ThreatLevel::from_confidence(confidence),
            detection_type: DetectionType::Smoke,
            source: "test".to_string(),
            estimated_area_m2: area,
            weather: None,
        }
    }

    #[test]
    fn radius_has_floor_and_scales() {
        assert_eq!(search_radius(150.0), 100.0);
        assert_eq!(search_radius(0.0), 100.0);
        assert_eq!(search_radius(10_000.0), 200.0);
        assert!((search_radius(5_000.0) - 141.421).abs() < 0.01);
    }

    #[test]
    fn below_tier_one_minimum_gets_no_tier() {
        let config = TieredResponseConfig::default();
        assert_eq!(initial_tier(&config, &detection(0.59, 100.0)), None);
        assert_eq!(
            initial_tier(&config, &detection(0.6, 100.0)),
            Some(ResponseTier::One)
        );
        assert_eq!(
            initial_tier(&config, &detection(0.99, 100.0)),
            Some(ResponseTier::One)
        );
    }

    #[test]
    fn tier_one_mission_carries_no_suppressant() {
        let config = TieredResponseConfig::default();
        let mission = mission_for_detection(&config, &detection(0.65, 150.0), ResponseTier::One, 7);
        assert_eq!(mission.status, MissionStatus::Pending);
        assert_eq!(mission.priority, MissionPriority::Medium);
        assert_eq!(mission.search_radius_m, 100.0);
        assert_eq!(mission.params.suppressant_amount_l, None);
        assert_eq!(mission.target_response_time_s, 180);
        assert_eq!(mission.escalation_triggers.size_threshold_m2, 200.0);
        assert!(!mission.params.emergency_protocol);
        assert_eq!(mission.mission_type(), "TIER_1_RESPONSE");
    }

    #[test]
    fn escalated_child_inherits_event_and_gets_tier_load() {
        let config = TieredResponseConfig::default();
        let parent = mission_for_detection(&config, &detection(0.75, 900.0), ResponseTier::One, 1);
        let child = escalated_mission(&config, &parent, ResponseTier::Two, 2);
        assert_eq!(child.fire_event_id, parent.fire_event_id);
        assert_eq!(child.parent_mission, Some(parent.id));
        assert_eq!(child.priority, parent.priority);
        assert_eq!(child.params.suppressant_amount_l, Some(50.0));
        assert_eq!(child.params.suppressant_type.as_deref(), Some("water"));

        let tier3 = escalated_mission(&config, &child, ResponseTier::Three, 3);
        assert_eq!(tier3.params.suppressant_amount_l, Some(200.0));
        assert!(tier3.params.emergency_protocol);
        assert_eq!(waypoints(&config, &tier3).len(), 5);
        assert_eq!(waypoints(&config, &child).len(), 1);
    }
}
