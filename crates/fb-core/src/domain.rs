use crate::ids::{AssetId, EscalationEventId, FireEventId, MissionId};
use crate::threat::ThreatLevel;
use crate::time::EpochMillis;
use fb_geo::GeoPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    Smoke,
    Flame,
    Heat,
    Thermal,
}

impl FromStr for DetectionType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "smoke" => Ok(Self::Smoke),
            "flame" | "fire" => Ok(Self::Flame),
            "heat" => Ok(Self::Heat),
            "thermal" | "ir" => Ok(Self::Thermal),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherConditions {
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub humidity: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireDetectionEvent {
    pub id: FireEventId,
    pub device_id: String,
    pub timestamp_ms: EpochMillis,
    pub location: GeoPoint,
    pub confidence: f64,
    pub threat_level: ThreatLevel,
    pub detection_type: DetectionType,
    pub source: String,
    pub estimated_area_m2: f64,
    #[serde(default)]
    pub weather: Option<WeatherConditions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ResponseTier {
    /// Verify the detection before committing heavier assets.
    One = 1,
    /// Direct suppression.
    Two = 2,
    /// Multi-asset containment perimeter.
    Three = 3,
}

impl ResponseTier {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::One => Some(Self::Two),
            Self::Two => Some(Self::Three),
            Self::Three => None,
        }
    }
}

impl From<ResponseTier> for u8 {
    fn from(value: ResponseTier) -> Self {
        value.number()
    }
}

impl TryFrom<u8> for ResponseTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(format!("response tier must be 1, 2 or 3, got {other}")),
        }
    }
}

impl fmt::Display for ResponseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Pending,
    Dispatched,
    Active,
    OnScene,
    Completed,
    Failed,
    Escalated,
}

impl MissionStatus {
    /// Statuses in which a mission holds assets and can still change course.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Dispatched | Self::Active | Self::OnScene)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Escalated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::Active => "active",
            Self::OnScene => "on_scene",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Escalated => "escalated",
        }
    }
}

impl FromStr for MissionStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "dispatched" => Ok(Self::Dispatched),
            "active" | "in_progress" => Ok(Self::Active),
            "on_scene" | "onscene" => Ok(Self::OnScene),
            "completed" | "complete" => Ok(Self::Completed),
            "failed" | "aborted" => Ok(Self::Failed),
            "escalated" => Ok(Self::Escalated),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl From<ThreatLevel> for MissionPriority {
    fn from(value: ThreatLevel) -> Self {
        match value {
            ThreatLevel::Low => Self::Low,
            ThreatLevel::Medium => Self::Medium,
            ThreatLevel::High => Self::High,
            ThreatLevel::Critical => Self::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionParams {
    pub max_flight_time_s: u32,
    #[serde(default)]
    pub suppressant_type: Option<String>,
    #[serde(default)]
    pub suppressant_amount_l: Option<f64>,
    pub return_to_base: bool,
    pub emergency_protocol: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscalationTriggers {
    pub time_threshold_s: u64,
    pub size_threshold_m2: f64,
    pub confidence_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionOutcome {
    pub fire_contained: bool,
    #[serde(default)]
    pub suppressant_used_l: Option<f64>,
    #[serde(default)]
    pub recommend_escalation: bool,
    #[serde(default)]
    pub escalation_reason: Option<String>,
}

impl MissionOutcome {
    pub fn stand_down(reason: impl Into<String>) -> Self {
        Self {
            fire_contained: true,
            suppressant_used_l: None,
            recommend_escalation: false,
            escalation_reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieredResponseMission {
    pub id: MissionId,
    pub fire_event_id: FireEventId,
    pub tier: ResponseTier,
    pub status: MissionStatus,
    pub priority: MissionPriority,
    pub created_at_ms: EpochMillis,
    #[serde(default)]
    pub dispatched_at_ms: Option<EpochMillis>,
    #[serde(default)]
    pub completed_at_ms: Option<EpochMillis>,
    pub updated_at_ms: EpochMillis,
    pub target_location: GeoPoint,
    pub search_radius_m: f64,
    #[serde(default)]
    pub assigned_assets: Vec<AssetId>,
    #[serde(default)]
    pub primary_asset: Option<AssetId>,
    pub params: MissionParams,
    pub target_response_time_s: u64,
    #[serde(default)]
    pub actual_response_time_s: Option<u64>,
    pub escalation_triggers: EscalationTriggers,
    #[serde(default)]
    pub outcome: Option<MissionOutcome>,
    #[serde(default)]
    pub parent_mission: Option<MissionId>,
    #[serde(default)]
    pub child_missions: Vec<MissionId>,
}

impl TieredResponseMission {
    pub fn mission_type(&self) -> String {
        format!("TIER_{}_RESPONSE", self.tier.number())
    }

    pub fn set_status(&mut self, status: MissionStatus, now_ms: EpochMillis) {
        self.status = status;
        self.updated_at_ms = now_ms;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Drone,
    Ugv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Online,
    Offline,
    Mission,
    Maintenance,
}

impl FromStr for AssetStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "online" | "available" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            "mission" => Ok(Self::Mission),
            "maintenance" => Ok(Self::Maintenance),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseAsset {
    pub id: AssetId,
    pub kind: AssetKind,
    pub status: AssetStatus,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub location: GeoPoint,
    pub battery: f64,
    #[serde(default)]
    pub assigned_mission: Option<MissionId>,
}

impl ResponseAsset {
    pub fn has_capabilities(&self, required: &[String]) -> bool {
        required
            .iter()
            .all(|capability| self.capabilities.iter().any(|owned| owned == capability))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationEvent {
    pub id: EscalationEventId,
    pub parent_mission_id: MissionId,
    pub child_mission_id: MissionId,
    pub from_tier: ResponseTier,
    pub to_tier: ResponseTier,
    pub timestamp_ms: EpochMillis,
    pub reason: String,
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub trigger_data: serde_json::Value,
}
