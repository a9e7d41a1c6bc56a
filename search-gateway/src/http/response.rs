//! Success envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body of every successful JSON response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ts: DateTime<Utc>,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// `200 OK` carrying `data`.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            ts: Utc::now(),
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// `200 OK` without data.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_is_omitted_when_absent() {
        let body = serde_json::to_value(ApiResponse::message("document deleted")).unwrap();
        assert_eq!(body["code"], 200);
        assert_eq!(body["message"], "document deleted");
        assert!(body.get("data").is_none());
        assert!(body["ts"].is_string());

        let body = serde_json::to_value(ApiResponse::ok("success", json!({ "a": 1 }))).unwrap();
        assert_eq!(body["data"]["a"], 1);
    }
}
