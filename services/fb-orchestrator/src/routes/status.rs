use actix_web::{HttpResponse, get, web};
use fb_core::now_epoch_millis;
use fb_response::SystemStatus;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct StatusResponse {
    service: String,
    environment: String,
    region: Option<String>,
    timestamp_ms: u64,
    #[serde(flatten)]
    system: SystemStatus,
}

#[get("/status")]
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let response = StatusResponse {
        service: state.config.service_name.clone(),
        environment: state.config.environment.to_string(),
        region: state.config.region.clone(),
        timestamp_ms: now_epoch_millis(),
        system: state.orchestrator.status().await,
    };

    HttpResponse::Ok().json(response)
}
