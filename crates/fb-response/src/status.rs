use fb_config::PerformanceTargets;
use fb_core::{MissionId, ResponseTier};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use crate::registry::AssetSummary;

const RECENT_RESPONSES: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct CompletedResponse {
    pub mission_id: MissionId,
    pub tier: ResponseTier,
    pub response_time_s: u64,
    pub met_target: bool,
    pub fire_contained: bool,
}

/// Running mission counters plus a window of the most recent completions.
#[derive(Debug, Default)]
pub struct PerformanceStats {
    dispatched: u64,
    failed: u64,
    escalated: u64,
    completed: u64,
    contained: u64,
    recent: VecDeque<CompletedResponse>,
}

impl PerformanceStats {
    pub fn record_dispatch(&mut self) {
        self.dispatched += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn record_escalation(&mut self) {
        self.escalated += 1;
    }

    pub fn record_completion(&mut self, response: CompletedResponse) {
        self.completed += 1;
        if response.fire_contained {
            self.contained += 1;
        }
        if self.recent.len() == RECENT_RESPONSES {
            self.recent.pop_front();
        }
        self.recent.push_back(response);
    }

    pub fn summary(&self, targets: &PerformanceTargets) -> PerformanceSummary {
        let mut by_tier: BTreeMap<u8, (u64, u64)> = BTreeMap::new();
        let mut met = 0usize;
        for response in &self.recent {
            let entry = by_tier.entry(response.tier.number()).or_default();
            entry.0 += response.response_time_s;
            entry.1 += 1;
            if response.met_target {
                met += 1;
            }
        }
        let ratio = |part: f64, whole: f64| (whole > 0.0).then(|| part / whole);

        PerformanceSummary {
            dispatched: self.dispatched,
            failed: self.failed,
            escalated: self.escalated,
            completed: self.completed,
            containment_rate: ratio(self.contained as f64, self.completed as f64),
            target_containment_rate: targets.containment_success_rate,
            within_target_rate: ratio(met as f64, self.recent.len() as f64),
            average_response_s: by_tier
                .into_iter()
                .map(|(tier, (total, count))| (tier, total as f64 / count as f64))
                .collect(),
            recent: self.recent.iter().rev().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub dispatched: u64,
    pub failed: u64,
    pub escalated: u64,
    pub completed: u64,
    pub containment_rate: Option<f64>,
    pub target_containment_rate: f64,
    pub within_target_rate: Option<f64>,
    /// Mean response time over the recent window, keyed by tier number.
    pub average_response_s: BTreeMap<u8, f64>,
    pub recent: Vec<CompletedResponse>,
}

/// Snapshot served by `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub tiered_response_enabled: bool,
    pub active_missions: usize,
    pub active_by_tier: BTreeMap<u8, usize>,
    pub assets: AssetSummary,
    pub performance: PerformanceSummary,
    pub escalations: usize,
    pub armed_timers: usize,
    pub dedup_keys: usize,
    pub backend_reachable: bool,
    pub degraded: bool,
}
