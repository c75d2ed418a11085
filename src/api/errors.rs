//! API Error Handling
//!
//! Structured error responses with HTTP status codes and request tracking.

use crate::errors::GameError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (INVALID_BET, NO_ACTIVE_ROUND, NOT_FOUND, ...)
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    Unprocessable,
    InternalError,
}

impl ApiErrorKind {
    fn status(self) -> StatusCode {
        match self {
            ApiErrorKind::NotFound => StatusCode::NOT_FOUND,
            ApiErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorKind::Conflict => StatusCode::CONFLICT,
            ApiErrorKind::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub code: &'static str,
    pub message: String,
    pub request_id: String,
}

impl ApiError {
    fn new(kind: ApiErrorKind, code: &'static str, request_id: String, message: String) -> Self {
        Self {
            kind,
            code,
            message,
            request_id,
        }
    }

    pub fn session_not_found(request_id: String, session_id: &str) -> Self {
        Self::new(
            ApiErrorKind::NotFound,
            "SESSION_NOT_FOUND",
            request_id,
            format!("Unknown session {}", session_id),
        )
    }

    pub fn session_required(request_id: String) -> Self {
        Self::new(
            ApiErrorKind::BadRequest,
            "SESSION_REQUIRED",
            request_id,
            "Missing x-session-id header".to_string(),
        )
    }

    pub fn bad_request(request_id: String, message: String) -> Self {
        Self::new(ApiErrorKind::BadRequest, "BAD_REQUEST", request_id, message)
    }

    /// Map a rejected game action onto a response
    pub fn from_game(request_id: String, error: &GameError) -> Self {
        let kind = match error {
            GameError::InvalidBet { .. } => ApiErrorKind::BadRequest,
            GameError::RoundInProgress | GameError::NoActiveRound => ApiErrorKind::Conflict,
            GameError::BustedOrInvalid { .. } | GameError::AmountOverflow { .. } => {
                ApiErrorKind::Unprocessable
            }
            GameError::InvalidParameter(_) | GameError::EntropyUnavailable(_) => {
                ApiErrorKind::InternalError
            }
        };
        Self::new(kind, error.code(), request_id, error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.request_id, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: self.code.to_string(),
                message: self.message,
            },
        });

        (status, body).into_response()
    }
}
