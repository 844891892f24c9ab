mod bus;
mod routes;
mod state;

use actix_web::{App, HttpServer, web};
use fb_config::{
    BackendConfig, FeatureToggles, ServiceConfig, TieredResponseConfig, TopicConfig,
    load_json_file,
};
use fb_core::{GeoPoint, ResponseAsset};
use fb_messaging::{ZmqPublisher, ZmqPublisherConfig, ZmqSubscriberConfig};
use fb_observability::{ObservabilityConfig, init, log_startup};
use fb_response::{
    DiscardPublisher, HttpMissionBackend, Orchestrator, OrchestratorParts, UpdatePublisher,
    default_fleet, events,
};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::bus::BusPublisher;
use crate::state::AppState;

const DEFAULT_PUBLISH_ENDPOINT: &str = "tcp://0.0.0.0:5556";
const DEFAULT_SUBSCRIBE_ENDPOINT: &str = "tcp://127.0.0.1:5555";

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = ServiceConfig::from_env("fb-orchestrator");
    let obs_config = ObservabilityConfig {
        service_name: config.service_name.clone(),
        environment: config.environment.to_string(),
        log_level: config.log_level.clone(),
        metrics_addr: config.metrics_addr.clone(),
    };
    let handle = init(&obs_config);
    log_startup(&handle, &obs_config.environment);

    let toggles = FeatureToggles::from_env();
    let tiers = TieredResponseConfig::load(
        config.tier_policy_path.as_deref(),
        toggles.autonomous_threshold,
    )
    .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
    let fleet = load_fleet(&config)?;
    info!(
        assets = fleet.len(),
        tiered = toggles.enable_tiered_response,
        "Response configuration loaded"
    );

    let backend = HttpMissionBackend::new(&BackendConfig::from_env())
        .map_err(|err| io::Error::other(err.to_string()))?;
    let topics = TopicConfig::from_env();
    let publisher = update_publisher(&config, &topics);

    let (orchestrator, receiver) = Orchestrator::new(OrchestratorParts {
        config: tiers,
        toggles,
        fleet,
        backend: Arc::new(backend),
        publisher,
        dedup_capacity: config.dedup_capacity,
    });
    tokio::spawn(events::run(orchestrator.clone(), receiver));

    let shutdown = Arc::new(AtomicBool::new(false));
    let subscriber_config =
        ZmqSubscriberConfig::from_env(DEFAULT_SUBSCRIBE_ENDPOINT, topics.inbound());
    bus::spawn_subscriber(
        subscriber_config,
        topics,
        orchestrator.event_sender(),
        shutdown.clone(),
    )?;

    let bind_addr = config.bind_addr.clone();
    let shared_state = web::Data::new(AppState {
        config,
        orchestrator,
    });

    let result = HttpServer::new(move || {
        App::new()
            .app_data(shared_state.clone())
            .configure(routes::configure)
    })
    .bind(bind_addr)?
    .run()
    .await;

    shutdown.store(true, Ordering::Relaxed);
    info!("Orchestrator stopped");
    result
}

fn load_fleet(config: &ServiceConfig) -> io::Result<Vec<ResponseAsset>> {
    if let Some(path) = config.fleet_path.as_deref() {
        return load_json_file(path)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()));
    }
    let staging = GeoPoint::new(env_f64("FB_STAGING_LAT", 0.0), env_f64("FB_STAGING_LNG", 0.0));
    Ok(default_fleet(staging))
}

fn update_publisher(config: &ServiceConfig, topics: &TopicConfig) -> Arc<dyn UpdatePublisher> {
    let publisher_config = ZmqPublisherConfig::from_env(DEFAULT_PUBLISH_ENDPOINT);
    match ZmqPublisher::new(&publisher_config) {
        Ok(publisher) => Arc::new(BusPublisher::new(
            publisher,
            topics.mission_updates.clone(),
            config.service_name.clone(),
        )),
        Err(err) => {
            warn!(
                endpoint = %publisher_config.socket.endpoint,
                error = %err,
                "Mission update publisher unavailable; updates will be dropped"
            );
            Arc::new(DiscardPublisher)
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
