use actix_web::{HttpResponse, get, web};

use crate::state::AppState;

#[get("/escalations")]
pub async fn list_escalations(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.orchestrator.escalations().await)
}
