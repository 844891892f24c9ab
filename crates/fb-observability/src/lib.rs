use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

pub const DETECTIONS_TOTAL: &str = "fb_detections_total";
pub const MISSIONS_DISPATCHED_TOTAL: &str = "fb_missions_dispatched_total";
pub const MISSIONS_FAILED_TOTAL: &str = "fb_missions_failed_total";
pub const MISSIONS_COMPLETED_TOTAL: &str = "fb_missions_completed_total";
pub const ESCALATIONS_TOTAL: &str = "fb_escalations_total";
pub const ACTIVE_MISSIONS: &str = "fb_active_missions";
pub const BUS_RECONNECTS_TOTAL: &str = "fb_bus_reconnects_total";

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
    pub metrics_addr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObservabilityHandle {
    pub service_name: String,
    pub metrics_enabled: bool,
}

pub fn init(config: &ObservabilityConfig) -> ObservabilityHandle {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);

    let metrics_enabled = init_metrics(config);
    if metrics_enabled {
        describe_metrics();
    }

    ObservabilityHandle {
        service_name: config.service_name.clone(),
        metrics_enabled,
    }
}

pub fn log_startup(handle: &ObservabilityHandle, environment: &str) {
    tracing::info!(
        service = %handle.service_name,
        environment = %environment,
        metrics_enabled = handle.metrics_enabled,
        "Firebreak service starting"
    );
}

fn describe_metrics() {
    metrics::describe_counter!(DETECTIONS_TOTAL, "Detections seen at intake, by outcome");
    metrics::describe_counter!(MISSIONS_DISPATCHED_TOTAL, "Missions dispatched, by tier");
    metrics::describe_counter!(MISSIONS_FAILED_TOTAL, "Missions that failed dispatch, by cause");
    metrics::describe_counter!(MISSIONS_COMPLETED_TOTAL, "Missions completed, by tier");
    metrics::describe_counter!(ESCALATIONS_TOTAL, "Escalations created, by reason");
    metrics::describe_gauge!(ACTIVE_MISSIONS, "Missions currently holding assets");
    metrics::describe_counter!(BUS_RECONNECTS_TOTAL, "Message bus subscriber reconnects");
}

fn init_metrics(config: &ObservabilityConfig) -> bool {
    let Some(addr) = config.metrics_addr.as_ref() else {
        return false;
    };
    let addr: SocketAddr = match addr.parse() {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(
                service = %config.service_name,
                error = %err,
                "Invalid FB_METRICS_ADDR value"
            );
            return false;
        }
    };

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", config.service_name.clone())
        .add_global_label("environment", config.environment.clone());

    match builder.install() {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(
                service = %config.service_name,
                error = %err,
                "Failed to initialize Prometheus exporter"
            );
            false
        }
    }
}
