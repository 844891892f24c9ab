use actix_web::{HttpResponse, get, post, web};
use fb_core::{MissionOutcome, TriggerType};
use fb_messaging::payloads::OutcomeReport;
use serde::Deserialize;
use serde_json::json;

use crate::routes::common::{bad_request, error_response, not_found, parse_mission_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateRequest {
    /// Defaults to the next tier up.
    #[serde(default)]
    pub to_tier: Option<u8>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
}

#[get("/missions")]
pub async fn list_missions(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.orchestrator.active_missions().await)
}

#[get("/missions/{id}")]
pub async fn get_mission(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    let mission_id = match parse_mission_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };

    match state.orchestrator.mission(mission_id).await {
        Some(mission) => HttpResponse::Ok().json(mission),
        None => not_found("mission not found"),
    }
}

#[post("/missions/{id}/complete")]
pub async fn complete_mission(
    state: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<OutcomeReport>,
) -> HttpResponse {
    let mission_id = match parse_mission_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let outcome = MissionOutcome::from(payload.into_inner());

    match state.orchestrator.complete(mission_id, outcome).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(err) => error_response(err),
    }
}

#[post("/missions/{id}/escalate")]
pub async fn escalate_mission(
    state: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<EscalateRequest>,
) -> HttpResponse {
    let mission_id = match parse_mission_id(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let request = payload.into_inner();
    let to_tier = match request.to_tier {
        Some(tier) => tier,
        None => match state.orchestrator.mission(mission_id).await {
            Some(mission) => match mission.tier.next() {
                Some(next) => next.number(),
                None => return bad_request("mission is already at tier 3"),
            },
            None => return not_found("mission not found"),
        },
    };
    let reason = request
        .reason
        .filter(|reason| !reason.trim().is_empty())
        .unwrap_or_else(|| "manual_escalation".to_string());
    let trigger_data = json!({ "source": "api", "operator": request.operator });

    match state
        .orchestrator
        .escalate(mission_id, to_tier, &reason, TriggerType::Manual, trigger_data)
        .await
    {
        Ok(event) => HttpResponse::Created().json(event),
        Err(err) => error_response(err),
    }
}
