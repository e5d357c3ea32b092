//! Error responses.
//!
//! Every failure leaves the gateway as a status code plus a JSON body of the
//! form `{"detail": "..."}`.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::scripts::ScriptError;
use crate::security::rate_limit::retry_after_header_secs;

/// Everything a request can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Rate limit exceeded. Try again in {retry_after_secs:.1} seconds.")]
    RateLimited { retry_after_secs: f64 },

    #[error("Access denied: Your IP is not whitelisted")]
    IpDenied,

    #[error("{0}")]
    Unauthorized(&'static str),

    /// Unreadable request body.
    #[error("{}", .0.body_text())]
    BadRequest(#[from] JsonRejection),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::IpDenied => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(rejection) => rejection.status(),
            ApiError::Script(e) => match e {
                ScriptError::InvalidName(_) | ScriptError::InvalidParameter(_) => {
                    StatusCode::BAD_REQUEST
                }
                ScriptError::NotFound(_) => StatusCode::NOT_FOUND,
                ScriptError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
                ScriptError::LaunchFailure(_) | ScriptError::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        match self {
            ApiError::RateLimited { retry_after_secs } => {
                let retry_after = retry_after_header_secs(retry_after_secs);
                let mut response = (
                    status,
                    Json(json!({ "detail": detail, "retry_after": retry_after })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                response
            }
            _ => (status, Json(json!({ "detail": detail }))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::IpDenied, 403),
            (ApiError::Unauthorized("x"), 401),
            (ApiError::RateLimited { retry_after_secs: 0.2 }, 429),
            (ScriptError::InvalidName("..".into()).into(), 400),
            (ScriptError::InvalidParameter("a b".into()).into(), 400),
            (ScriptError::NotFound("x".into()).into(), 404),
            (ScriptError::Timeout(Duration::from_secs(300)).into(), 408),
            (
                ScriptError::LaunchFailure(std::io::Error::from(std::io::ErrorKind::PermissionDenied)).into(),
                500,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status().as_u16(), status, "{}", err);
        }
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let response = ApiError::RateLimited { retry_after_secs: 1.2 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");

        let body = body_json(response).await;
        assert_eq!(body["retry_after"], 2);
        assert_eq!(body["detail"], "Rate limit exceeded. Try again in 1.2 seconds.");
    }

    #[tokio::test]
    async fn test_detail_body() {
        let response = ApiError::from(ScriptError::NotFound("ghost.py".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["detail"], "Script not found: ghost.py");
    }
}
