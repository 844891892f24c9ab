use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use fb_core::{ErrorCode, FbError, MissionId};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: message.into(),
        code: None,
    })
}

pub fn not_found(message: impl Into<String>) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: message.into(),
        code: None,
    })
}

/// Maps an engine error onto an HTTP status by its code.
pub fn error_response(err: impl Into<FbError>) -> HttpResponse {
    let err = err.into();
    let (status, code) = match err.code {
        ErrorCode::InvalidInput => (StatusCode::BAD_REQUEST, "invalid_input"),
        ErrorCode::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        ErrorCode::Conflict => (StatusCode::CONFLICT, "conflict"),
        ErrorCode::Rejected => (StatusCode::TOO_MANY_REQUESTS, "rejected"),
        ErrorCode::Exhausted => (StatusCode::SERVICE_UNAVAILABLE, "exhausted"),
        ErrorCode::Timeout => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        ErrorCode::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        ErrorCode::Upstream => (StatusCode::BAD_GATEWAY, "upstream"),
        ErrorCode::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    HttpResponse::build(status).json(ErrorResponse {
        error: err.message,
        code: Some(code),
    })
}

pub fn parse_mission_id(value: &str) -> Result<MissionId, HttpResponse> {
    Uuid::parse_str(value)
        .map(MissionId::from_uuid)
        .map_err(|_| bad_request("invalid mission id"))
}
