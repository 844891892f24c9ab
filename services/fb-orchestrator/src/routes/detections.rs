use actix_web::{HttpResponse, post, web};
use fb_response::{DetectionOutcome, InboundDetection, SimulatedDetection};

use crate::routes::common::{bad_request, error_response};
use crate::state::AppState;

#[post("/detections")]
pub async fn submit_detection(
    state: web::Data<AppState>,
    payload: web::Json<SimulatedDetection>,
) -> HttpResponse {
    let detection = payload.into_inner();
    if !(0.0..=1.0).contains(&detection.confidence) {
        return bad_request("confidence must be within [0, 1]");
    }

    match state
        .orchestrator
        .ingest(InboundDetection::Simulated(detection))
        .await
    {
        Ok(DetectionOutcome::Rejected) => bad_request("detection has no usable coordinates"),
        Ok(outcome @ DetectionOutcome::Tiered { .. })
        | Ok(outcome @ DetectionOutcome::LegacyDispatched { .. }) => {
            HttpResponse::Created().json(outcome)
        }
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(err) => error_response(err),
    }
}
