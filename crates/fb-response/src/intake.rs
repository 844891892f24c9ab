//! Detection intake: normalizes inbound shapes into [`FireDetectionEvent`] and suppresses
//! repeats of the same physical event.
//!
//! Dedup keys built from rounded coordinates can merge two distinct fires closer than the
//! rounding step, or split one fire reported by sources with different ids. The behaviour is
//! kept for compatibility with existing producers.

use fb_core::{
    DetectionType, FireDetectionEvent, FireEventId, GeoPoint, ThreatLevel, WeatherConditions,
    now_epoch_millis,
};
use fb_messaging::payloads::{AlertMessage, TriangulationMessage};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::f64::consts::PI;
use tokio::sync::Mutex;
use tracing::warn;

const DEFAULT_ALERT_CONFIDENCE: f64 = 0.5;
const DEFAULT_TRIANGULATION_CONFIDENCE: f64 = 0.7;
const DEFAULT_AREA_M2: f64 = 100.0;

/// Detection submitted directly through the API or a simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedDetection {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub confidence: f64,
    #[serde(default)]
    pub detection_type: Option<String>,
    #[serde(default)]
    pub estimated_area: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub weather: Option<WeatherConditions>,
}

#[derive(Debug, Clone)]
pub enum InboundDetection {
    Alert(AlertMessage),
    Triangulation(TriangulationMessage),
    Simulated(SimulatedDetection),
}

/// A normalized detection paired with its dedup key.
#[derive(Debug, Clone)]
pub struct NormalizedDetection {
    pub dedup_key: String,
    pub event: FireDetectionEvent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeatherWire {
    wind_speed: f64,
    #[serde(default)]
    wind_direction: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    temperature: f64,
}

pub fn normalize(inbound: &InboundDetection) -> Option<NormalizedDetection> {
    let normalized = match inbound {
        InboundDetection::Alert(alert) => from_alert(alert),
        InboundDetection::Triangulation(result) => from_triangulation(result),
        InboundDetection::Simulated(detection) => from_simulated(detection),
    };
    if normalized.is_none() {
        warn!(source = source_label(inbound), "Rejecting detection without usable coordinates");
    }
    normalized
}

fn source_label(inbound: &InboundDetection) -> &'static str {
    match inbound {
        InboundDetection::Alert(_) => "alert",
        InboundDetection::Triangulation(_) => "triangulation",
        InboundDetection::Simulated(_) => "api",
    }
}

fn from_alert(alert: &AlertMessage) -> Option<NormalizedDetection> {
    let location = alert.coordinates().filter(GeoPoint::is_valid)?;
    let source = alert.metadata_str("source").unwrap_or("sensor_alert").to_string();
    let device_id = alert
        .metadata_str("deviceId")
        .or_else(|| alert.metadata_str("device_id"))
        .unwrap_or("unknown")
        .to_string();
    let weather = alert
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.get("weather"))
        .and_then(|value| serde_json::from_value::<WeatherWire>(value.clone()).ok())
        .map(|wire| WeatherConditions {
            wind_speed: wire.wind_speed,
            wind_direction: wire.wind_direction,
            humidity: wire.humidity,
            temperature: wire.temperature,
        });
    let message_id = alert
        .metadata_str("alertId")
        .or_else(|| alert.metadata_str("id"))
        .map(str::to_string);

    let confidence = alert.confidence.unwrap_or(DEFAULT_ALERT_CONFIDENCE);
    Some(NormalizedDetection {
        dedup_key: message_id.unwrap_or_else(|| coordinate_key(&source, location)),
        event: build_event(
            device_id,
            location,
            confidence,
            alert.alert_type.parse().unwrap_or(DetectionType::Smoke),
            source,
            alert.metadata_f64("estimatedArea").unwrap_or(DEFAULT_AREA_M2),
            weather,
        ),
    })
}

fn from_triangulation(result: &TriangulationMessage) -> Option<NormalizedDetection> {
    let location = match (result.latitude, result.longitude) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    }
    .filter(GeoPoint::is_valid)?;
    let source = "triangulation".to_string();
    // Uncertainty circle stands in for the burning area until a drone measures it.
    let area = result
        .uncertainty_meters
        .map(|radius| PI * radius * radius)
        .unwrap_or(DEFAULT_AREA_M2)
        .max(DEFAULT_AREA_M2);

    Some(NormalizedDetection {
        dedup_key: result
            .id
            .clone()
            .unwrap_or_else(|| coordinate_key(&source, location)),
        event: build_event(
            "triangulation".to_string(),
            location,
            result.confidence.unwrap_or(DEFAULT_TRIANGULATION_CONFIDENCE),
            DetectionType::Smoke,
            source,
            area,
            None,
        ),
    })
}

fn from_simulated(detection: &SimulatedDetection) -> Option<NormalizedDetection> {
    let location = match (detection.latitude, detection.longitude) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    }
    .filter(GeoPoint::is_valid)?;
    let source = detection.source.clone().unwrap_or_else(|| "api".to_string());

    Some(NormalizedDetection {
        dedup_key: detection
            .id
            .clone()
            .unwrap_or_else(|| coordinate_key(&source, location)),
        event: build_event(
            detection
                .device_id
                .clone()
                .unwrap_or_else(|| "simulator".to_string()),
            location,
            detection.confidence,
            detection
                .detection_type
                .as_deref()
                .and_then(|value| value.parse().ok())
                .unwrap_or(DetectionType::Flame),
            source,
            detection.estimated_area.unwrap_or(DEFAULT_AREA_M2),
            detection.weather,
        ),
    })
}

fn build_event(
    device_id: String,
    location: GeoPoint,
    confidence: f64,
    detection_type: DetectionType,
    source: String,
    estimated_area_m2: f64,
    weather: Option<WeatherConditions>,
) -> FireDetectionEvent {
    let confidence = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    FireDetectionEvent {
        id: FireEventId::new(),
        device_id,
        timestamp_ms: now_epoch_millis(),
        location,
        confidence,
        threat_level: ThreatLevel::from_confidence(confidence),
        detection_type,
        source,
        estimated_area_m2: estimated_area_m2.max(0.0),
        weather,
    }
}

pub fn coordinate_key(source: &str, location: GeoPoint) -> String {
    format!("{}:{:.6}:{:.6}", source, location.lat, location.lng)
}

/// Bounded set of seen dedup keys; the oldest key is evicted once `capacity` is reached.
#[derive(Debug)]
struct SeenKeys {
    capacity: usize,
    keys: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenKeys {
    fn insert(&mut self, key: &str) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
        self.keys.insert(key.to_string());
        self.order.push_back(key.to_string());
        true
    }
}

#[derive(Debug)]
pub struct DedupFilter {
    seen: Mutex<SeenKeys>,
}

impl DedupFilter {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(SeenKeys {
                capacity: capacity.max(1),
                keys: HashSet::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Atomically records `key`; false when it was already seen.
    pub async fn first_sighting(&self, key: &str) -> bool {
        self.seen.lock().await.insert(key)
    }

    pub async fn len(&self) -> usize {
        self.seen.lock().await.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_without_coordinates_is_rejected() {
        let alert = AlertMessage {
            alert_type: "smoke".to_string(),
            confidence: Some(0.9),
            ..AlertMessage::default()
        };
        assert!(normalize(&InboundDetection::Alert(alert)).is_none());
    }

    #[test]
    fn alert_uses_metadata_id_for_dedup() {
        let alert: AlertMessage = serde_json::from_str(
            r#"{"type":"flame","confidence":0.82,"latitude":38.5,"longitude":-121.25,
                "metadata":{"alertId":"tower-9-0041","deviceId":"tower-9","estimatedArea":400.0,
                "weather":{"windSpeed":6.5,"humidity":18.0}}}"#,
        )
        .unwrap();
        let normalized = normalize(&InboundDetection::Alert(alert)).unwrap();
        assert_eq!(normalized.dedup_key, "tower-9-0041");
        assert_eq!(normalized.event.device_id, "tower-9");
        assert_eq!(normalized.event.detection_type, DetectionType::Flame);
        assert_eq!(normalized.event.threat_level, ThreatLevel::High);
        assert_eq!(normalized.event.estimated_area_m2, 400.0);
        assert_eq!(normalized.event.weather.unwrap().wind_speed, 6.5);
    }

    #[test]
    fn triangulation_defaults_and_key() {
        let result = TriangulationMessage {
            latitude: Some(38.1234567),
            longitude: Some(-120.7654321),
            uncertainty_meters: Some(20.0),
            ..TriangulationMessage::default()
        };
        let normalized = normalize(&InboundDetection::Triangulation(result)).unwrap();
        assert_eq!(normalized.dedup_key, "triangulation:38.123457:-120.765432");
        assert_eq!(normalized.event.confidence, 0.7);
        assert!((normalized.event.estimated_area_m2 - PI * 400.0).abs() < 1e-6);
    }

    #[test]
    fn confidence_is_clamped() {
        let detection = SimulatedDetection {
            id: None,
            device_id: None,
            latitude: Some(10.0),
            longitude: Some(10.0),
            confidence: 1.7,
            detection_type: Some("thermal".to_string()),
            estimated_area: None,
            source: None,
            weather: None,
        };
        let normalized = normalize(&InboundDetection::Simulated(detection)).unwrap();
        assert_eq!(normalized.event.confidence, 1.0);
        assert_eq!(normalized.event.threat_level, ThreatLevel::Critical);
        assert_eq!(normalized.dedup_key, "api:10.000000:10.000000");
    }

    #[tokio::test]
    async fn dedup_drops_repeats_and_evicts_oldest() {
        let filter = DedupFilter::new(2);
        assert!(filter.first_sighting("a").await);
        assert!(!filter.first_sighting("a").await);
        assert!(filter.first_sighting("b").await);
        assert!(filter.first_sighting("c").await);
        assert_eq!(filter.len().await, 2);
        assert!(filter.first_sighting("a").await);
    }
}
