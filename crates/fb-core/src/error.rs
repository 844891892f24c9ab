use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidInput,
    NotFound,
    Conflict,
    Rejected,
    Exhausted,
    Timeout,
    Unavailable,
    Upstream,
    Internal,
}

#[derive(Debug, Clone)]
pub struct FbError {
    pub code: ErrorCode,
    pub message: String,
}

impl FbError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for FbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for FbError {}

pub type FbResult<T> = Result<T, FbError>;
