use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    RateLimited,
    ProcessUnavailable,
    Internal,
}

/// Error body returned by the process gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl GatewayErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway rejected request ({status}): {code:?}: {message}")]
    Rejected {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    #[error("unexpected gateway status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl GatewayError {
    /// Builds the error for a non-success response, keeping the structured
    /// body when the gateway sent one.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<GatewayErrorBody>(body) {
            Ok(parsed) => GatewayError::Rejected {
                status,
                code: parsed.code,
                message: parsed.message,
            },
            Err(_) => GatewayError::UnexpectedStatus {
                status,
                body: body.to_string(),
            },
        }
    }
}
