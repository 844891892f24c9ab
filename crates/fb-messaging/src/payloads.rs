//! Wire payloads carried on the bus. Field names follow the producers' camelCase JSON.

use fb_core::{AssetId, GeoPoint, MissionId, MissionOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

/// Raw sensor-tower alert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMessage {
    #[serde(rename = "type")]
    pub alert_type: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub location: Option<LatLon>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl AlertMessage {
    /// Top-level coordinates win over the nested location object.
    pub fn coordinates(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude, self.location) {
            (Some(lat), Some(lng), _) => Some(GeoPoint::new(lat, lng)),
            (_, _, Some(location)) => Some(GeoPoint::new(location.latitude, location.longitude)),
            _ => None,
        }
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }

    pub fn metadata_f64(&self, key: &str) -> Option<f64> {
        self.metadata.as_ref()?.get(key)?.as_f64()
    }
}

/// Multi-tower triangulation result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangulationMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, alias = "uncertaintyMeters")]
    pub uncertainty_meters: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireSize {
    pub estimated_area: f64,
    #[serde(default)]
    pub perimeter: f64,
    #[serde(default)]
    pub intensity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAssessment {
    pub current_threat_level: String,
    #[serde(default)]
    pub predicted_spread: Option<f64>,
    #[serde(default)]
    pub assets_at_risk: Vec<String>,
    #[serde(default)]
    pub suppression_strategy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationData {
    pub mission_id: MissionId,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
    pub fire_confirmed: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub fire_size: FireSize,
    #[serde(default)]
    pub refined_location: Option<GeoPoint>,
    #[serde(default)]
    pub environmental_data: Option<serde_json::Value>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub threat_assessment: ThreatAssessment,
    #[serde(default)]
    pub recommended_action: String,
    #[serde(default)]
    pub recommended_tier: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReport {
    pub fire_contained: bool,
    #[serde(default)]
    pub suppressant_used: Option<f64>,
    #[serde(default)]
    pub recommend_escalation: bool,
    #[serde(default)]
    pub escalation_reason: Option<String>,
}

impl From<OutcomeReport> for MissionOutcome {
    fn from(report: OutcomeReport) -> Self {
        Self {
            fire_contained: report.fire_contained,
            suppressant_used_l: report.suppressant_used,
            recommend_escalation: report.recommend_escalation,
            escalation_reason: report.escalation_reason,
        }
    }
}

/// Status transition reported by the external orchestration backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionStatusMessage {
    pub mission_id: MissionId,
    pub status: String,
    #[serde(default)]
    pub outcome: Option<OutcomeReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTelemetry {
    pub asset_id: AssetId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub battery: Option<f64>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateLocation {
    pub lat: f64,
    pub lng: f64,
    pub radius: f64,
}

/// Console-facing mission update, published at most once per state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionUpdate {
    pub id: String,
    #[serde(rename = "type")]
    pub mission_type: String,
    pub status: String,
    pub priority: String,
    pub location: UpdateLocation,
    pub description: String,
    pub created_at: u64,
    pub updated_at: u64,
    pub tier: Option<u8>,
    pub assigned_assets: Vec<AssetId>,
}
