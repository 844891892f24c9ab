use fb_config::AssetProfile;
use fb_core::{AssetId, AssetKind, AssetStatus, GeoPoint, MissionId, ResponseAsset};
use fb_messaging::payloads::AssetTelemetry;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Assets below this charge are never selected for a mission.
pub const MIN_DISPATCH_BATTERY: f64 = 30.0;

#[derive(Debug, Clone, Serialize)]
pub struct AssetSummary {
    pub total: usize,
    pub online: usize,
    pub on_mission: usize,
    pub offline: usize,
    pub maintenance: usize,
    pub capabilities: BTreeMap<String, usize>,
}

/// Shared pool of drones and ground vehicles.
///
/// Not synchronized on its own: the orchestrator keeps it behind the same lock as mission
/// state so selection and binding form one critical section.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: HashMap<AssetId, ResponseAsset>,
}

impl AssetRegistry {
    pub fn new(assets: Vec<ResponseAsset>) -> Self {
        let assets = assets
            .into_iter()
            .map(|mut asset| {
                if asset.status != AssetStatus::Mission {
                    asset.assigned_mission = None;
                }
                (asset.id.clone(), asset)
            })
            .collect();
        Self { assets }
    }

    pub fn get(&self, id: &AssetId) -> Option<&ResponseAsset> {
        self.assets.get(id)
    }

    pub fn list(&self) -> Vec<ResponseAsset> {
        let mut assets = self.assets.values().cloned().collect::<Vec<_>>();
        assets.sort_by(|a, b| a.id.cmp(&b.id));
        assets
    }

    /// Qualifying assets for `profile`, fullest battery first, at most `max_assets`.
    pub fn select(&self, profile: &AssetProfile) -> Vec<AssetId> {
        let mut candidates = self
            .assets
            .values()
            .filter(|asset| {
                asset.status == AssetStatus::Online
                    && asset.battery > MIN_DISPATCH_BATTERY
                    && asset.has_capabilities(&profile.required_capabilities)
            })
            .collect::<Vec<_>>();
        candidates.sort_by(|a, b| {
            b.battery
                .total_cmp(&a.battery)
                .then_with(|| a.id.cmp(&b.id))
        });
        candidates
            .into_iter()
            .take(profile.max_assets)
            .map(|asset| asset.id.clone())
            .collect()
    }

    pub fn bind(&mut self, ids: &[AssetId], mission_id: MissionId) {
        for id in ids {
            if let Some(asset) = self.assets.get_mut(id) {
                asset.status = AssetStatus::Mission;
                asset.assigned_mission = Some(mission_id);
            }
        }
    }

    /// Returns assets bound to `mission_id` to the online pool. Assets since reassigned
    /// elsewhere are left alone.
    pub fn release(&mut self, ids: &[AssetId], mission_id: MissionId) -> usize {
        let mut released = 0;
        for id in ids {
            match self.assets.get_mut(id) {
                Some(asset) if asset.assigned_mission == Some(mission_id) => {
                    asset.status = AssetStatus::Online;
                    asset.assigned_mission = None;
                    released += 1;
                }
                Some(asset) => {
                    warn!(
                        asset_id = %id,
                        mission_id = %mission_id,
                        assigned = ?asset.assigned_mission,
                        "Skipping release of asset not bound to mission"
                    );
                }
                None => warn!(asset_id = %id, "Release requested for unknown asset"),
            }
        }
        released
    }

    pub fn apply_telemetry(&mut self, telemetry: &AssetTelemetry) -> bool {
        let Some(asset) = self.assets.get_mut(&telemetry.asset_id) else {
            debug!(asset_id = %telemetry.asset_id, "Telemetry for unregistered asset");
            return false;
        };
        if let Some(battery) = telemetry.battery {
            asset.battery = battery.clamp(0.0, 100.0);
        }
        if let Some(location) = telemetry.location {
            asset.location = location;
        }
        if let Some(status) = telemetry.status.as_deref() {
            match status.parse::<AssetStatus>() {
                Ok(AssetStatus::Mission) | Err(()) => {
                    warn!(asset_id = %asset.id, status, "Ignoring unsupported telemetry status");
                }
                Ok(next) if asset.assigned_mission.is_some() => {
                    warn!(
                        asset_id = %asset.id,
                        status = ?next,
                        "Asset reported status change while bound to a mission"
                    );
                }
                Ok(next) => asset.status = next,
            }
        }
        true
    }

    pub fn summary(&self) -> AssetSummary {
        let mut summary = AssetSummary {
            total: self.assets.len(),
            online: 0,
            on_mission: 0,
            offline: 0,
            maintenance: 0,
            capabilities: BTreeMap::new(),
        };
        for asset in self.assets.values() {
            match asset.status {
                AssetStatus::Online => summary.online += 1,
                AssetStatus::Mission => summary.on_mission += 1,
                AssetStatus::Offline => summary.offline += 1,
                AssetStatus::Maintenance => summary.maintenance += 1,
            }
            for capability in &asset.capabilities {
                *summary.capabilities.entry(capability.clone()).or_default() += 1;
            }
        }
        summary
    }
}

/// Fleet used when no fleet file is configured: verification drones, suppression drones and
/// two suppression UGVs staged at `base`.
pub fn default_fleet(base: GeoPoint) -> Vec<ResponseAsset> {
    let scout = ["thermal_camera", "rgb_camera", "gps"];
    let suppressor = ["thermal_camera", "suppressant_system", "gps"];
    let mut fleet = Vec::new();
    for idx in 1..=3 {
        fleet.push(asset(&format!("scout-{idx}"), AssetKind::Drone, &scout, base));
    }
    for idx in 1..=4 {
        fleet.push(asset(&format!("tanker-{idx}"), AssetKind::Drone, &suppressor, base));
    }
    for idx in 1..=2 {
        fleet.push(asset(&format!("ugv-{idx}"), AssetKind::Ugv, &suppressor, base));
    }
    fleet
}

fn asset(id: &str, kind: AssetKind, capabilities: &[&str], base: GeoPoint) -> ResponseAsset {
    ResponseAsset {
        id: AssetId::new(id),
        kind,
        status: AssetStatus::Online,
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        location: base,
        battery: 100.0,
        assigned_mission: None,
    }
}
