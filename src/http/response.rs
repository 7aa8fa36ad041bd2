//! Response building.
//!
//! # Design Decisions
//! - Every handler failure becomes HTTP 400 with `{"error": message}`
//! - Success bodies are the handler output serialized as-is

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::calculator::{CalcError, CalcResult};

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A handler failure on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub CalcError);

impl From<CalcError> for ApiError {
    fn from(err: CalcError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Map a handler result to a response.
pub fn respond<T: Serialize>(result: CalcResult<T>) -> Response {
    match result {
        Ok(output) => (StatusCode::OK, Json(output)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status() {
        let response = respond::<()>(Err(CalcError::DivisionByZero));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_success_status() {
        let response = respond(Ok(serde_json::json!({"result": 1})));
        assert_eq!(response.status(), StatusCode::OK);
    }
}
