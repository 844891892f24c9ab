pub mod domain;
pub mod error;
pub mod ids;
pub mod threat;
pub mod time;

pub use domain::{
    AssetKind, AssetStatus, DetectionType, EscalationEvent, EscalationTriggers,
    FireDetectionEvent, MissionOutcome, MissionParams, MissionPriority, MissionStatus,
    ResponseAsset, ResponseTier, TieredResponseMission, TriggerType, WeatherConditions,
};
pub use error::{ErrorCode, FbError, FbResult};
pub use fb_geo::GeoPoint;
pub use ids::{AssetId, CorrelationId, EscalationEventId, FireEventId, MessageId, MissionId};
pub use threat::ThreatLevel;
pub use time::{elapsed_secs, now_epoch_millis, EpochMillis};
