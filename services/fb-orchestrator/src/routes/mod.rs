pub mod common;
pub mod detections;
pub mod escalations;
pub mod health;
pub mod missions;
pub mod status;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(status::status)
        .service(missions::list_missions)
        .service(missions::get_mission)
        .service(missions::complete_mission)
        .service(missions::escalate_mission)
        .service(escalations::list_escalations)
        .service(detections::submit_detection);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use actix_web::{App, http::StatusCode, test};
    use async_trait::async_trait;
    use fb_config::{FeatureToggles, ServiceConfig, TieredResponseConfig};
    use fb_core::GeoPoint;
    use fb_response::{
        BackendError, MissionBackend, MissionCreateRequest, Orchestrator, OrchestratorParts,
        RecordingPublisher, default_fleet,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct AcceptingBackend;

    #[async_trait]
    impl MissionBackend for AcceptingBackend {
        async fn create_mission(&self, _request: &MissionCreateRequest) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn app_state() -> web::Data<AppState> {
        let (orchestrator, _events) = Orchestrator::new(OrchestratorParts {
            config: TieredResponseConfig::default(),
            toggles: FeatureToggles::default(),
            fleet: default_fleet(GeoPoint::new(38.0, -120.0)),
            backend: Arc::new(AcceptingBackend),
            publisher: Arc::new(RecordingPublisher::default()),
            dedup_capacity: 100,
        });
        web::Data::new(AppState {
            config: ServiceConfig::from_env("fb-orchestrator-test"),
            orchestrator,
        })
    }

    #[actix_web::test]
    async fn health_reports_ok() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[actix_web::test]
    async fn detection_escalation_and_completion_over_http() {
        let state = app_state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/detections")
            .set_json(json!({
                "id": "api-1",
                "latitude": 38.4,
                "longitude": -120.2,
                "confidence": 0.8,
                "estimatedArea": 400.0
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["outcome"], "tiered");
        let mission_id = created["mission_id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/detections")
            .set_json(json!({"id": "api-1", "latitude": 38.4, "longitude": -120.2, "confidence": 0.8}))
            .to_request();
        let duplicate: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(duplicate["outcome"], "duplicate");

        let req = test::TestRequest::post()
            .uri(&format!("/missions/{mission_id}/escalate"))
            .set_json(json!({"reason": "operator_request", "operator": "duty-officer"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let event: Value = test::read_body_json(resp).await;
        assert_eq!(event["to_tier"], 2);
        assert_eq!(event["trigger_type"], "manual");
        let child_id = event["child_mission_id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/missions/{mission_id}/escalate"))
            .set_json(json!({"toTier": 1}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri(&format!("/missions/{child_id}/complete"))
            .set_json(json!({"fireContained": true, "suppressantUsed": 35.0}))
            .to_request();
        let report: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(report["released_assets"], 2);

        let req = test::TestRequest::get().uri("/escalations").to_request();
        let escalations: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(escalations.as_array().map(Vec::len), Some(1));

        let req = test::TestRequest::get().uri("/missions").to_request();
        let active: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(active.as_array().map(Vec::len), Some(0));

        let req = test::TestRequest::get().uri("/status").to_request();
        let status: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status["escalations"], 1);
        assert_eq!(status["degraded"], false);
        assert_eq!(status["assets"]["online"], 9);
    }

    #[actix_web::test]
    async fn unknown_and_malformed_mission_ids() {
        let state = app_state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/missions/not-a-uuid").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/missions/6f1c2a3e-8a5b-4c1d-9e2f-0a1b2c3d4e5f")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/missions/6f1c2a3e-8a5b-4c1d-9e2f-0a1b2c3d4e5f/complete")
            .set_json(json!({"fireContained": true}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
