use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::analytics::AnalyticsError;
use crate::services::session_workflow::WorkflowError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// `{"success": 0, "message": ...}` for every handled non-500 failure.
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: u8,
    message: String,
}

#[derive(Debug, Serialize)]
struct InternalErrorEnvelope {
    success: u8,
    error: String,
    message: &'static str,
    status_code: u16,
}

#[derive(Debug, Serialize)]
struct SuccessEnvelope<T> {
    success: u8,
    data: T,
    message: String,
    status_code: u16,
}

/// Successful handler result, rendered as `{"success": 1, "data": ..., "message": ...}`.
#[derive(Debug)]
pub(crate) struct ApiResponse<T> {
    data: T,
    message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn ok(data: T, message: impl Into<String>) -> Self {
        Self { data, message: message.into() }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::OK;
        (
            status,
            Json(SuccessEnvelope {
                success: 1,
                data: self.data,
                message: self.message,
                status_code: status.as_u16(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Internal(context) => (
                status,
                Json(InternalErrorEnvelope {
                    success: 0,
                    error: context,
                    message: INTERNAL_MESSAGE,
                    status_code: status.as_u16(),
                }),
            )
                .into_response(),
            ApiError::Unauthorized(message) => {
                let mut response =
                    (status, Json(ErrorEnvelope { success: 0, message: message.to_string() }))
                        .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) | ApiError::TooManyRequests(message) => {
                (status, Json(ErrorEnvelope { success: 0, message: message.to_string() }))
                    .into_response()
            }
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => {
                (status, Json(ErrorEnvelope { success: 0, message })).into_response()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::SessionNotFound | WorkflowError::AnswerNotFound => {
                ApiError::NotFound(err.to_string())
            }
            WorkflowError::Forbidden => ApiError::Forbidden("Access denied"),
            WorkflowError::Database(err) => ApiError::internal(err, "Session operation failed"),
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        ApiError::internal(err, "Failed to load analytics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::read_json;

    #[tokio::test]
    async fn not_found_uses_business_envelope() {
        let response = ApiError::from(WorkflowError::SessionNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = read_json(response).await;
        assert_eq!(body, serde_json::json!({"success": 0, "message": "Session not found"}));
    }

    #[tokio::test]
    async fn unauthorized_sets_www_authenticate() {
        let response = ApiError::Unauthorized("Invalid authentication credentials").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).and_then(|v| v.to_str().ok()),
            Some("Bearer")
        );
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let response = ApiError::internal("connection reset", "Failed to load user").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_json(response).await;
        assert_eq!(body["success"], 0);
        assert_eq!(body["status_code"], 500);
        assert_eq!(body["error"], "Failed to load user");
        assert_eq!(body["message"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn success_envelope_wraps_data() {
        let response = ApiResponse::ok(serde_json::json!({"id": "x"}), "Done").into_response();
        let body = read_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({
                "success": 1,
                "data": {"id": "x"},
                "message": "Done",
                "status_code": 200
            })
        );
    }
}
