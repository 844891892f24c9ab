//! Policy gate for the non-autonomous dispatch path.
//!
//! Evaluation is pure: no I/O, no mutation. A denial always carries at least one reason.

use fb_core::{AssetId, GeoPoint, MissionPriority, ThreatLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    pub wind_speed_mps: Option<f64>,
    pub visibility_m: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAsset {
    pub id: AssetId,
    pub battery: f64,
    pub link_ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyContext {
    pub target: GeoPoint,
    pub confidence: f64,
    pub min_confidence: f64,
    #[serde(default)]
    pub environment: Option<EnvironmentReading>,
    #[serde(default)]
    pub candidates: Vec<CandidateAsset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConstraints {
    pub max_altitude_m: f64,
    pub standoff_m: f64,
    pub require_operator_confirm: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allow: bool,
    pub priority: MissionPriority,
    pub constraints: PolicyConstraints,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum GateRule {
    MinimumConfidence,
    MaxWindSpeed { limit_mps: f64 },
    MinVisibility { limit_m: f64 },
    ReadyAsset { min_battery: f64 },
}

impl GateRule {
    /// Returns the denial reason when the rule rejects the context.
    fn check(&self, context: &PolicyContext) -> Option<String> {
        match *self {
            Self::MinimumConfidence => (context.confidence < context.min_confidence).then(|| {
                format!(
                    "confidence {:.2} below minimum {:.2}",
                    context.confidence, context.min_confidence
                )
            }),
            Self::MaxWindSpeed { limit_mps } => context
                .environment
                .and_then(|env| env.wind_speed_mps)
                .filter(|wind| *wind > limit_mps)
                .map(|wind| format!("wind {wind:.1} m/s exceeds {limit_mps:.1} m/s limit")),
            Self::MinVisibility { limit_m } => context
                .environment
                .and_then(|env| env.visibility_m)
                .filter(|visibility| *visibility < limit_m)
                .map(|visibility| format!("visibility {visibility:.0} m below {limit_m:.0} m")),
            Self::ReadyAsset { min_battery } => {
                let ready = context
                    .candidates
                    .iter()
                    .any(|asset| asset.link_ok && asset.battery >= min_battery);
                (!ready).then(|| {
                    format!("no candidate asset with live link and battery >= {min_battery:.0}%")
                })
            }
        }
    }
}

pub trait PolicyEngine {
    fn evaluate(&self, context: &PolicyContext) -> PolicyDecision;
}

#[derive(Debug, Clone)]
pub struct PolicyGate {
    rules: Vec<GateRule>,
    require_confirm: bool,
}

impl PolicyGate {
    pub fn new(rules: Vec<GateRule>, require_confirm: bool) -> Self {
        Self {
            rules,
            require_confirm,
        }
    }

    pub fn with_default_rules(require_confirm: bool) -> Self {
        Self::new(default_rules(), require_confirm)
    }

    fn constraints(&self, context: &PolicyContext, priority: MissionPriority) -> PolicyConstraints {
        let gusty = context
            .environment
            .and_then(|env| env.wind_speed_mps)
            .is_some_and(|wind| wind > 10.0);
        PolicyConstraints {
            max_altitude_m: if gusty { 60.0 } else { 120.0 },
            standoff_m: if priority >= MissionPriority::High {
                100.0
            } else {
                50.0
            },
            require_operator_confirm: self.require_confirm,
        }
    }
}

impl PolicyEngine for PolicyGate {
    fn evaluate(&self, context: &PolicyContext) -> PolicyDecision {
        let priority = MissionPriority::from(ThreatLevel::from_confidence(context.confidence));
        let mut reasons = self
            .rules
            .iter()
            .filter_map(|rule| rule.check(context))
            .collect::<Vec<_>>();

        if !context.target.is_valid() {
            reasons.push("target location out of range".to_string());
        }

        let allow = reasons.is_empty();
        if allow {
            reasons.push("all gate rules satisfied".to_string());
        }

        PolicyDecision {
            allow,
            priority,
            constraints: self.constraints(context, priority),
            reasons,
        }
    }
}

fn default_rules() -> Vec<GateRule> {
    vec![
        GateRule::MinimumConfidence,
        GateRule::MaxWindSpeed { limit_mps: 15.0 },
        GateRule::MinVisibility { limit_m: 500.0 },
        GateRule::ReadyAsset { min_battery: 30.0 },
    ]
}
