//! API error handling
//!
//! Every handler returns `ApiResult`; the [`ApiError`] wrapper maps the core
//! taxonomy onto HTTP statuses and a `{ "error": ... }` body. Store and
//! internal failures are logged and surfaced generically.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use tb_core::error::TbError;
use tb_core::traits::Id;

#[derive(Debug)]
pub struct ApiError(pub TbError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<TbError> for ApiError {
    fn from(e: TbError) -> Self {
        ApiError(e)
    }
}

impl From<tb_auth::JwtError> for ApiError {
    fn from(e: tb_auth::JwtError) -> Self {
        ApiError(TbError::unauthorized(e.to_string()))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    offending_ids: Vec<Id>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.0.is_client_safe() {
            self.0.to_string()
        } else {
            error!(error = %self.0, "Request failed");
            "Internal server error".to_string()
        };
        let offending_ids = match &self.0 {
            TbError::Precondition { offending_ids, .. } => offending_ids.clone(),
            _ => Vec::new(),
        };

        (
            status,
            Json(ErrorBody {
                error: message,
                code: self.0.error_code(),
                offending_ids,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_maps_to_400_with_ids() {
        let err = ApiError(TbError::precondition_with_ids("unfinished", vec![3, 5]));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_error_maps_to_500() {
        let err = ApiError(TbError::Store("connection refused".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
