//! Authentication, CORS and request tracing layers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};
use tracing::{debug, warn, Span};

use crate::config::CorsSettings;
use crate::http::error::ApiError;
use search_gateway_repository::SearchError;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Verifies HMAC-signed bearer tokens.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // Registered claims are checked when present but none is mandatory.
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate the `Authorization` header value.
    pub fn verify(&self, authorization: Option<&str>) -> Result<(), SearchError> {
        let Some(authorization) = authorization.filter(|v| !v.is_empty()) else {
            return Err(SearchError::unauthorized("Authorization token required"));
        };

        let Some(token) = authorization.strip_prefix("Bearer ") else {
            return Err(SearchError::unauthorized("Invalid authorization format"));
        };

        decode::<Value>(token, &self.key, &self.validation)
            .map(|_| ())
            .map_err(|e| SearchError::unauthorized("Invalid token").with_details(e.to_string()))
    }
}

/// Reject requests without a valid bearer token.
pub async fn require_bearer(
    State(verifier): State<Arc<TokenVerifier>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = verifier.verify(authorization) {
        debug!(reason = %e.message(), "Request rejected");
        return Err(e.into());
    }

    Ok(next.run(request).await)
}

/// Build the CORS layer.
///
/// A `*` origin or header list is mirrored from the request when credentials
/// are allowed, since browsers reject wildcards on credentialed requests.
pub fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let wildcard = |values: &[String]| values.iter().any(|v| v == "*");

    let origin = if wildcard(&settings.origins) {
        if settings.credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::from(Any)
        }
    } else {
        let origins: Vec<HeaderValue> = settings
            .origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    let headers = if wildcard(&settings.headers) {
        if settings.credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::from(Any)
        }
    } else {
        AllowHeaders::list(
            settings
                .headers
                .iter()
                .filter_map(|h| HeaderName::try_from(h.as_str()).ok()),
        )
    };

    let methods: Vec<Method> = settings
        .methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(settings.credentials)
}

/// Span for one HTTP request, tagged with its request id.
pub fn request_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}
