//! Errors the gateway turns into HTTP responses.

use serde::Serialize;
use thiserror::Error;

use crate::http::parser::ParseError;
use crate::http::response::{Response, StatusCode};

/// Every failure a caller can observe as a gateway-generated response.
///
/// Backend responses, including backend 4xx/5xx, are relayed verbatim and
/// never become a `GatewayError`.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing or invalid {header} header")]
    Unauthorized { header: String },

    #[error("No route for {0}")]
    RouteNotFound(String),

    #[error("Malformed request: {0}")]
    BadRequest(ParseError),

    #[error("Dot segments are not allowed in {0}")]
    InvalidTarget(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Backend connection failed: {0}")]
    UpstreamConnect(#[source] std::io::Error),

    #[error("Backend did not respond in time")]
    UpstreamTimeout,

    #[error("Invalid backend response: {0}")]
    InvalidUpstreamResponse(String),

    #[error("Unsupported backend scheme: {0}")]
    UnsupportedScheme(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized { .. } => StatusCode::Unauthorized,
            GatewayError::RouteNotFound(_) => StatusCode::NotFound,
            GatewayError::BadRequest(_) | GatewayError::InvalidTarget(_) => StatusCode::BadRequest,
            GatewayError::PayloadTooLarge => StatusCode::PayloadTooLarge,
            GatewayError::UpstreamConnect(_) => StatusCode::BadGateway,
            GatewayError::UpstreamTimeout => StatusCode::GatewayTimeout,
            GatewayError::InvalidUpstreamResponse(_) => StatusCode::BadGateway,
            GatewayError::UnsupportedScheme(_) => StatusCode::BadGateway,
        }
    }

    /// Machine-readable error code placed in the `error` field.
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized { .. } => "Unauthorized",
            GatewayError::RouteNotFound(_) => "NotFound",
            GatewayError::BadRequest(_) | GatewayError::InvalidTarget(_) => "BadRequest",
            GatewayError::PayloadTooLarge => "PayloadTooLarge",
            GatewayError::UpstreamTimeout => "GatewayTimeout",
            GatewayError::UpstreamConnect(_)
            | GatewayError::InvalidUpstreamResponse(_)
            | GatewayError::UnsupportedScheme(_) => "BadGateway",
        }
    }

    /// Renders `{"error": ..., "message": ...}` with the mapped status.
    pub fn to_response(&self) -> Response {
        Response::json(
            self.status_code(),
            &ErrorBody {
                error: self.error_code(),
                message: self.to_string(),
            },
        )
    }
}

impl From<ParseError> for GatewayError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::HeadersTooLarge | ParseError::BodyTooLarge => GatewayError::PayloadTooLarge,
            other => GatewayError::BadRequest(other),
        }
    }
}
