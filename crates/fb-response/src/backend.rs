use async_trait::async_trait;
use fb_config::{BackendConfig, TieredResponseConfig};
use fb_core::{AssetId, FireDetectionEvent, MissionId, MissionPriority, TieredResponseMission};
use fb_geo::Waypoint;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;

use crate::error::BackendError;
use crate::planner;

pub const LEGACY_MISSION_TYPE: &str = "LEGACY_RESPONSE";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionParameters {
    pub search_radius: f64,
    pub max_flight_time: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppressant_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppressant_amount: Option<f64>,
    pub emergency_protocol: bool,
}

/// Body of `POST /missions` on the orchestration backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionCreateRequest {
    pub id: MissionId,
    #[serde(rename = "type")]
    pub mission_type: String,
    pub priority: MissionPriority,
    pub assigned_to: Vec<AssetId>,
    pub waypoints: Vec<Waypoint>,
    pub parameters: MissionParameters,
}

impl MissionCreateRequest {
    pub fn for_mission(config: &TieredResponseConfig, mission: &TieredResponseMission) -> Self {
        Self {
            id: mission.id,
            mission_type: mission.mission_type(),
            priority: mission.priority,
            assigned_to: mission.assigned_assets.clone(),
            waypoints: planner::waypoints(config, mission),
            parameters: MissionParameters {
                search_radius: mission.search_radius_m,
                max_flight_time: mission.params.max_flight_time_s,
                suppressant_type: mission.params.suppressant_type.clone(),
                suppressant_amount: mission.params.suppressant_amount_l,
                emergency_protocol: mission.params.emergency_protocol,
            },
        }
    }

    /// Single-asset request issued by the policy-gate fallback path.
    pub fn legacy(
        id: MissionId,
        detection: &FireDetectionEvent,
        asset: AssetId,
        priority: MissionPriority,
        altitude_m: f64,
        max_flight_time_s: u32,
    ) -> Self {
        Self {
            id,
            mission_type: LEGACY_MISSION_TYPE.to_string(),
            priority,
            assigned_to: vec![asset],
            waypoints: vec![Waypoint::at(detection.location, altitude_m)],
            parameters: MissionParameters {
                search_radius: planner::search_radius(detection.estimated_area_m2),
                max_flight_time: max_flight_time_s,
                suppressant_type: None,
                suppressant_amount: None,
                emergency_protocol: false,
            },
        }
    }
}

/// External capability that actually flies or drives a mission.
#[async_trait]
pub trait MissionBackend: Send + Sync {
    async fn create_mission(&self, request: &MissionCreateRequest) -> Result<(), BackendError>;
}

#[derive(Clone)]
pub struct HttpMissionBackend {
    client: Client,
    missions_url: Url,
}

impl HttpMissionBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let missions_url = missions_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| BackendError::Unreachable("invalid backend api key".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            missions_url,
        })
    }
}

/// `{base}/missions`, keeping any path prefix on the base.
fn missions_url(base_url: &str) -> Result<Url, BackendError> {
    let mut url = Url::parse(base_url)
        .map_err(|err| BackendError::Unreachable(format!("invalid backend url: {err}")))?;
    url.path_segments_mut()
        .map_err(|_| BackendError::Unreachable(format!("backend url has no path: {base_url}")))?
        .pop_if_empty()
        .push("missions");
    Ok(url)
}

#[async_trait]
impl MissionBackend for HttpMissionBackend {
    async fn create_mission(&self, request: &MissionCreateRequest) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.missions_url.clone())
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fb_core::{DetectionType, FireDetectionEvent, FireEventId, GeoPoint, ResponseTier, ThreatLevel};

    #[test]
    fn request_matches_backend_contract() {
        let config = TieredResponseConfig::default();
        let detection = FireDetectionEvent {
            id: FireEventId::new(),
            device_id: "tower-3".to_string(),
            timestamp_ms: 0,
            location: GeoPoint::new(36.5, -118.5),
            confidence: 0.8,
            threat_level: ThreatLevel::High,
            detection_type: DetectionType::Flame,
            source: "test".to_string(),
            estimated_area_m2: 3_600.0,
            weather: None,
        };
        let parent = planner::mission_for_detection(&config, &detection, ResponseTier::One, 0);
        let mut mission = planner::escalated_mission(&config, &parent, ResponseTier::Two, 0);
        mission.assigned_assets = vec![AssetId::new("tanker-1")];

        let value = serde_json::to_value(MissionCreateRequest::for_mission(&config, &mission)).unwrap();
        assert_eq!(value["type"], "TIER_2_RESPONSE");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["assignedTo"][0], "tanker-1");
        assert_eq!(value["waypoints"][0]["lat"], 36.5);
        assert_eq!(value["waypoints"][0]["alt"], 60.0);
        assert_eq!(value["parameters"]["searchRadius"], 120.0);
        assert_eq!(value["parameters"]["suppressantAmount"], 50.0);
        assert_eq!(value["parameters"]["emergencyProtocol"], false);
    }

    #[test]
    fn tier_one_request_omits_suppressant() {
        let config = TieredResponseConfig::default();
        let detection = FireDetectionEvent {
            id: FireEventId::new(),
            device_id: "tower-3".to_string(),
            timestamp_ms: 0,
            location: GeoPoint::new(36.5, -118.5),
            confidence: 0.65,
            threat_level: ThreatLevel::Medium,
            detection_type: DetectionType::Smoke,
            source: "test".to_string(),
            estimated_area_m2: 150.0,
            weather: None,
        };
        let mission = planner::mission_for_detection(&config, &detection, ResponseTier::One, 0);
        let value = serde_json::to_value(MissionCreateRequest::for_mission(&config, &mission)).unwrap();
        assert!(value["parameters"].get("suppressantType").is_none());
        assert!(value["parameters"].get("suppressantAmount").is_none());
    }

    #[test]
    fn missions_url_keeps_the_base_path() {
        assert_eq!(
            missions_url("http://backend:9000").unwrap().as_str(),
            "http://backend:9000/missions"
        );
        assert_eq!(
            missions_url("http://backend/api/v1").unwrap().as_str(),
            "http://backend/api/v1/missions"
        );
        assert_eq!(
            missions_url("http://backend/api/v1/").unwrap().as_str(),
            "http://backend/api/v1/missions"
        );
        assert!(missions_url("mailto:ops@example.com").is_err());
    }

    #[test]
    fn http_backend_rejects_bad_url() {
        let config = BackendConfig {
            base_url: "not a url".to_string(),
            api_key: None,
            timeout_ms: 100,
        };
        assert!(HttpMissionBackend::new(&config).is_err());
    }
}
