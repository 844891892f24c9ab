use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Maps detection confidence onto a threat level. Boundaries are inclusive on the lower side.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.90 {
            Self::Critical
        } else if confidence >= 0.70 {
            Self::High
        } else if confidence >= 0.40 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl FromStr for ThreatLevel {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "moderate" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" | "extreme" => Ok(Self::Critical),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ThreatLevel;

    #[test]
    fn confidence_boundaries_are_exact() {
        assert_eq!(ThreatLevel::from_confidence(1.0), ThreatLevel::Critical);
        assert_eq!(ThreatLevel::from_confidence(0.90), ThreatLevel::Critical);
        assert_eq!(ThreatLevel::from_confidence(0.8999), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_confidence(0.70), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_confidence(0.6999), ThreatLevel::Medium);
        assert_eq!(ThreatLevel::from_confidence(0.40), ThreatLevel::Medium);
        assert_eq!(ThreatLevel::from_confidence(0.3999), ThreatLevel::Low);
        assert_eq!(ThreatLevel::from_confidence(0.0), ThreatLevel::Low);
    }

    #[test]
    fn parses_external_spellings() {
        assert_eq!("CRITICAL".parse::<ThreatLevel>(), Ok(ThreatLevel::Critical));
        assert_eq!("moderate".parse::<ThreatLevel>(), Ok(ThreatLevel::Medium));
        assert!("unknown".parse::<ThreatLevel>().is_err());
    }
}
