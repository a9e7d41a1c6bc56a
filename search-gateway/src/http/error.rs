//! Error responses.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, warn};

use search_gateway_repository::SearchError;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub ts: DateTime<Utc>,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(rename = "type")]
    pub error_type: String,
}

impl ErrorEnvelope {
    /// Build the envelope for `err`; `details` is only kept when `verbose`.
    pub fn from_error(err: &SearchError, verbose: bool) -> Self {
        Self {
            ts: Utc::now(),
            code: err.status(),
            message: err.message().to_string(),
            details: if verbose {
                err.details().map(str::to_string)
            } else {
                None
            },
            error_type: err.error_type().to_string(),
        }
    }
}

/// The error carried by a response, kept so outer layers can re-render it.
#[derive(Debug, Clone)]
pub struct ErrorReport(pub SearchError);

/// Handler error rendered as an [`ErrorEnvelope`].
#[derive(Debug)]
pub struct ApiError(pub SearchError);

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(SearchError::bad_request("invalid request payload").with_details(rejection.body_text()))
    }
}

fn status_of(err: &SearchError) -> StatusCode {
    StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        if status.is_server_error() {
            error!(
                error_type = %self.0.error_type(),
                details = self.0.details().unwrap_or_default(),
                "{}",
                self.0.message()
            );
        } else {
            warn!(
                error_type = %self.0.error_type(),
                details = self.0.details().unwrap_or_default(),
                "{}",
                self.0.message()
            );
        }

        let mut response = (status, Json(ErrorEnvelope::from_error(&self.0, false))).into_response();
        response.extensions_mut().insert(ErrorReport(self.0));
        response
    }
}

/// Re-render error responses with their details included.
pub async fn detailed_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let Some(ErrorReport(err)) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    let (parts, _) = response.into_parts();
    match serde_json::to_vec(&ErrorEnvelope::from_error(&err, true)) {
        Ok(body) => Response::from_parts(parts, Body::from(body)),
        Err(e) => {
            error!(error = %e, "Failed to serialize error envelope");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Unwrap a JSON body, mapping a rejection to `bad_request`.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}
