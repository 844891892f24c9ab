use fb_core::{ErrorCode, FbError, MissionId, MissionStatus, ResponseTier};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("orchestration backend unreachable: {0}")]
    Unreachable(String),
    #[error("orchestration backend rejected mission: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for BackendError {
    fn from(value: reqwest::Error) -> Self {
        Self::Unreachable(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("admission rejected: {0}")]
    AdmissionRejected(String),
    #[error("no qualifying assets for tier {tier} mission {mission_id}")]
    NoQualifyingAssets {
        mission_id: MissionId,
        tier: ResponseTier,
    },
    #[error("backend dispatch failed for mission {mission_id}: {source}")]
    Backend {
        mission_id: MissionId,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("mission {0} not found")]
    NotFound(MissionId),
    #[error("escalation must be upward: tier {from} to tier {to}")]
    NotUpward { from: ResponseTier, to: u8 },
    #[error("mission {mission_id} cannot escalate from status {}", .status.as_str())]
    NotEscalatable {
        mission_id: MissionId,
        status: MissionStatus,
    },
    #[error("escalation already in flight for mission {0}")]
    InFlight(MissionId),
    /// The parent finished while its child was being dispatched; the child was stood down.
    #[error("mission {mission_id} finished as {} while escalating; child {child_id} stood down", .status.as_str())]
    Superseded {
        mission_id: MissionId,
        child_id: MissionId,
        status: MissionStatus,
    },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("mission {0} not found")]
    NotFound(MissionId),
    #[error("mission {mission_id} already finished with status {}", .status.as_str())]
    AlreadyFinished {
        mission_id: MissionId,
        status: MissionStatus,
    },
}

impl From<&DispatchError> for ErrorCode {
    fn from(value: &DispatchError) -> Self {
        match value {
            DispatchError::AdmissionRejected(_) => ErrorCode::Rejected,
            DispatchError::NoQualifyingAssets { .. } => ErrorCode::Exhausted,
            DispatchError::Backend { .. } => ErrorCode::Upstream,
        }
    }
}

impl From<DispatchError> for FbError {
    fn from(value: DispatchError) -> Self {
        FbError::new(ErrorCode::from(&value), value.to_string())
    }
}

impl From<EscalationError> for FbError {
    fn from(value: EscalationError) -> Self {
        let code = match &value {
            EscalationError::NotFound(_) => ErrorCode::NotFound,
            EscalationError::NotUpward { .. } => ErrorCode::InvalidInput,
            EscalationError::NotEscalatable { .. }
            | EscalationError::InFlight(_)
            | EscalationError::Superseded { .. } => ErrorCode::Conflict,
            EscalationError::Dispatch(inner) => ErrorCode::from(inner),
        };
        FbError::new(code, value.to_string())
    }
}

impl From<CompletionError> for FbError {
    fn from(value: CompletionError) -> Self {
        let code = match &value {
            CompletionError::NotFound(_) => ErrorCode::NotFound,
            CompletionError::AlreadyFinished { .. } => ErrorCode::Conflict,
        };
        FbError::new(code, value.to_string())
    }
}
