use fb_core::{ErrorCode, FbError, FbResult, ResponseTier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub min_confidence: f64,
    pub size_threshold_m2: f64,
    pub time_threshold_s: u64,
    pub escalation_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetProfile {
    pub required_capabilities: Vec<String>,
    pub max_assets: usize,
    pub max_flight_time_s: u32,
    pub cruise_altitude_m: f64,
    pub suppressant_type: Option<String>,
    pub suppressant_amount_l: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPolicy {
    pub thresholds: TierThresholds,
    pub assets: AssetProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationalLimits {
    pub max_concurrent_missions: usize,
    pub max_tier3_missions: usize,
    /// Skips admission limits when set.
    pub emergency_override: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceTargets {
    pub tier1_response_s: u64,
    pub tier2_response_s: u64,
    pub tier3_response_s: u64,
    pub containment_success_rate: f64,
}

/// Process-wide response policy. Loaded once at startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TieredResponseConfig {
    pub tier1: TierPolicy,
    pub tier2: TierPolicy,
    pub tier3: TierPolicy,
    pub limits: OperationalLimits,
    pub targets: PerformanceTargets,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            size_threshold_m2: 200.0,
            time_threshold_s: 300,
            escalation_confidence: 0.8,
        }
    }
}

impl Default for AssetProfile {
    fn default() -> Self {
        Self {
            required_capabilities: vec!["thermal_camera".to_string()],
            max_assets: 1,
            max_flight_time_s: 1_200,
            cruise_altitude_m: 120.0,
            suppressant_type: None,
            suppressant_amount_l: None,
        }
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            assets: AssetProfile::default(),
        }
    }
}

impl Default for OperationalLimits {
    fn default() -> Self {
        Self {
            max_concurrent_missions: 10,
            max_tier3_missions: 3,
            emergency_override: false,
        }
    }
}

impl Default for PerformanceTargets {
    fn default() -> Self {
        Self {
            tier1_response_s: 180,
            tier2_response_s: 300,
            tier3_response_s: 600,
            containment_success_rate: 0.85,
        }
    }
}

impl Default for TieredResponseConfig {
    fn default() -> Self {
        Self {
            tier1: TierPolicy::default(),
            tier2: TierPolicy {
                thresholds: TierThresholds {
                    min_confidence: 0.75,
                    size_threshold_m2: 1_000.0,
                    time_threshold_s: 600,
                    escalation_confidence: 0.85,
                },
                assets: AssetProfile {
                    required_capabilities: vec!["suppressant_system".to_string()],
                    max_assets: 2,
                    max_flight_time_s: 1_800,
                    cruise_altitude_m: 60.0,
                    suppressant_type: Some("water".to_string()),
                    suppressant_amount_l: Some(50.0),
                },
            },
            tier3: TierPolicy {
                thresholds: TierThresholds {
                    min_confidence: 0.85,
                    size_threshold_m2: 5_000.0,
                    time_threshold_s: 1_200,
                    escalation_confidence: 0.9,
                },
                assets: AssetProfile {
                    required_capabilities: vec!["suppressant_system".to_string()],
                    max_assets: 4,
                    max_flight_time_s: 2_700,
                    cruise_altitude_m: 80.0,
                    suppressant_type: Some("fire_retardant".to_string()),
                    suppressant_amount_l: Some(200.0),
                },
            },
            limits: OperationalLimits::default(),
            targets: PerformanceTargets::default(),
        }
    }
}

impl TieredResponseConfig {
    pub fn tier(&self, tier: ResponseTier) -> &TierPolicy {
        match tier {
            ResponseTier::One => &self.tier1,
            ResponseTier::Two => &self.tier2,
            ResponseTier::Three => &self.tier3,
        }
    }

    pub fn response_target_s(&self, tier: ResponseTier) -> u64 {
        match tier {
            ResponseTier::One => self.targets.tier1_response_s,
            ResponseTier::Two => self.targets.tier2_response_s,
            ResponseTier::Three => self.targets.tier3_response_s,
        }
    }

    /// Loads the policy from `path` when given, then applies `autonomous_threshold`.
    pub fn load(path: Option<&str>, autonomous_threshold: Option<f64>) -> FbResult<Self> {
        let mut config = match path {
            Some(path) => crate::load_json_file::<Self>(path)?,
            None => Self::default(),
        };
        if let Some(threshold) = autonomous_threshold {
            config.tier1.thresholds.min_confidence = threshold;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FbResult<()> {
        for (tier, policy) in [
            (ResponseTier::One, &self.tier1),
            (ResponseTier::Two, &self.tier2),
            (ResponseTier::Three, &self.tier3),
        ] {
            if !(0.0..=1.0).contains(&policy.thresholds.min_confidence) {
                return Err(FbError::new(
                    ErrorCode::InvalidInput,
                    format!("tier {tier} min_confidence must be within [0, 1]"),
                ));
            }
            if policy.assets.max_assets == 0 {
                return Err(FbError::new(
                    ErrorCode::InvalidInput,
                    format!("tier {tier} max_assets must be at least 1"),
                ));
            }
            if policy.thresholds.time_threshold_s == 0 {
                return Err(FbError::new(
                    ErrorCode::InvalidInput,
                    format!("tier {tier} time_threshold_s must be positive"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_escalate_toward_heavier_profiles() {
        let config = TieredResponseConfig::default();
        assert!(config.tier1.assets.suppressant_amount_l.is_none());
        assert!(
            config.tier3.assets.suppressant_amount_l > config.tier2.assets.suppressant_amount_l
        );
        assert!(config.tier3.assets.max_assets > config.tier2.assets.max_assets);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let raw = r#"{ "tier1": { "thresholds": { "min_confidence": 0.55 } } }"#;
        let config: TieredResponseConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.tier1.thresholds.min_confidence, 0.55);
        assert_eq!(config.tier1.thresholds.size_threshold_m2, 200.0);
        assert_eq!(config.limits.max_concurrent_missions, 10);
    }

    #[test]
    fn autonomous_threshold_overrides_tier_one() {
        let config = TieredResponseConfig::load(None, Some(0.42)).unwrap();
        assert_eq!(config.tier1.thresholds.min_confidence, 0.42);
        assert!(TieredResponseConfig::load(None, Some(1.5)).is_err());
    }
}
