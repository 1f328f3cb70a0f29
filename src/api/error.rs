use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde_json::json;

use crate::errors::{DbError, DomainError, ServiceError};

/// Wrapper mapping service errors onto HTTP responses.
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::Configuration(_) => StatusCode::BAD_REQUEST,
            ServiceError::NothingToExport(_) => StatusCode::NOT_FOUND,
            ServiceError::AlreadyScheduled(_) => StatusCode::LOCKED,
            ServiceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Domain(DomainError::EntityNotFound(_, _)) => StatusCode::NOT_FOUND,
            ServiceError::Domain(DomainError::Database(DbError::NotFound(_, _))) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Domain(DomainError::Database(DbError::Conflict(_))) => {
                StatusCode::LOCKED
            }
            ServiceError::Domain(DomainError::Validation(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Domain(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ServiceError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(ServiceError::Configuration("bad key".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::NothingToExport("empty".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::AlreadyScheduled("all".into())),
            StatusCode::LOCKED
        );
        assert_eq!(
            status_of(ServiceError::ServiceUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ServiceError::Domain(DomainError::EntityNotFound(
                "object".into(),
                "dataset.zip".into()
            ))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::Domain(DomainError::Internal("boom".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
