use fb_core::{ErrorCode, FbError, FbResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{env, fmt, fs};

mod tiers;

pub use tiers::{
    AssetProfile, OperationalLimits, PerformanceTargets, TierPolicy, TierThresholds,
    TieredResponseConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Local,
    Dev,
    Test,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_env(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "local" => Self::Local,
            "dev" | "development" => Self::Dev,
            "test" | "testing" => Self::Test,
            "staging" => Self::Staging,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Prod => "prod",
        };
        write!(f, "{}", value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub environment: Environment,
    pub region: Option<String>,
    pub bind_addr: String,
    pub metrics_addr: Option<String>,
    pub log_level: String,
    pub fleet_path: Option<String>,
    pub tier_policy_path: Option<String>,
    pub dedup_capacity: usize,
}

impl ServiceConfig {
    pub fn from_env(default_service_name: &str) -> Self {
        Self {
            service_name: env_var("FB_SERVICE_NAME", default_service_name.to_string()),
            environment: Environment::from_env(&env_var("FB_ENV", "local".to_string())),
            region: env::var("FB_REGION").ok(),
            bind_addr: env_var("FB_BIND_ADDR", "0.0.0.0:8080".to_string()),
            metrics_addr: env::var("FB_METRICS_ADDR").ok(),
            log_level: env_var("FB_LOG_LEVEL", "info".to_string()),
            fleet_path: env::var("FB_FLEET_PATH").ok(),
            tier_policy_path: env::var("FB_TIER_POLICY_PATH").ok(),
            dedup_capacity: env_var_usize("FB_DEDUP_CAPACITY", 10_000),
        }
    }
}

/// Connection settings for the external mission orchestration backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_var("FB_BACKEND_URL", "http://127.0.0.1:9000".to_string()),
            api_key: env::var("FB_BACKEND_API_KEY").ok(),
            timeout_ms: env_var_u64("FB_BACKEND_TIMEOUT_MS", 5_000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    pub alerts: String,
    pub triangulations: String,
    pub verification: String,
    pub mission_status: String,
    pub asset_telemetry: String,
    pub mission_updates: String,
}

impl TopicConfig {
    pub fn from_env() -> Self {
        Self {
            alerts: env_var("FB_TOPIC_ALERTS", "alerts".to_string()),
            triangulations: env_var("FB_TOPIC_TRIANGULATIONS", "triangulations".to_string()),
            verification: env_var("FB_TOPIC_VERIFICATION", "verification".to_string()),
            mission_status: env_var("FB_TOPIC_MISSION_STATUS", "mission_status".to_string()),
            asset_telemetry: env_var("FB_TOPIC_ASSET_TELEMETRY", "asset_telemetry".to_string()),
            mission_updates: env_var("FB_TOPIC_MISSION_UPDATES", "mission_updates".to_string()),
        }
    }

    pub fn inbound(&self) -> Vec<String> {
        vec![
            self.alerts.clone(),
            self.triangulations.clone(),
            self.verification.clone(),
            self.mission_status.clone(),
            self.asset_telemetry.clone(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureToggles {
    pub enable_tiered_response: bool,
    /// Overrides the tier 1 minimum confidence when set.
    pub autonomous_threshold: Option<f64>,
    /// Minimum confidence for the legacy policy gate.
    pub min_confidence: f64,
    pub require_confirm: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            enable_tiered_response: true,
            autonomous_threshold: None,
            min_confidence: 0.5,
            require_confirm: false,
        }
    }
}

impl FeatureToggles {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enable_tiered_response: env_var_bool(
                "ENABLE_TIERED_RESPONSE",
                defaults.enable_tiered_response,
            ),
            autonomous_threshold: env_var_f64("AUTONOMOUS_THRESHOLD"),
            min_confidence: env_var_f64("MIN_CONFIDENCE").unwrap_or(defaults.min_confidence),
            require_confirm: env_var_bool("REQUIRE_CONFIRM", defaults.require_confirm),
        }
    }
}

/// Reads and deserializes a JSON document from disk.
pub fn load_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> FbResult<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|err| {
        FbError::new(
            ErrorCode::InvalidInput,
            format!("failed to read {}: {}", path.display(), err),
        )
    })?;
    serde_json::from_str(&raw).map_err(|err| {
        FbError::new(
            ErrorCode::InvalidInput,
            format!("failed to parse {}: {}", path.display(), err),
        )
    })
}

fn env_var(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_var_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_var_f64(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

fn env_var_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|value| parse_bool(&value, default))
        .unwrap_or(default)
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing_falls_back_to_default() {
        assert!(parse_bool("YES", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("maybe", true));
    }

    #[test]
    fn missing_file_is_invalid_input() {
        let err = load_json_file::<TieredResponseConfig>("/nonexistent/tiers.json").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn inbound_topics_exclude_updates() {
        let topics = TopicConfig {
            alerts: "a".to_string(),
            triangulations: "t".to_string(),
            verification: "v".to_string(),
            mission_status: "s".to_string(),
            asset_telemetry: "x".to_string(),
            mission_updates: "u".to_string(),
        };
        assert_eq!(topics.inbound(), vec!["a", "t", "v", "s", "x"]);
    }
}
