//! Errors surfaced by the relay endpoint.
//!
//! Every variant maps to a status code and a short public message. The `Display` text can carry
//! upstream detail and is only ever logged; callers see the public message.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("no upstream API key is configured")]
    MissingCredential,

    #[error("configured upstream API key is not a valid header value")]
    InvalidCredential,

    #[error("request body rejected: {message}")]
    Body { status: StatusCode, message: String },

    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("request body must be a JSON object or array")]
    NotAnObjectOrArray,

    #[error("invalid upstream uri {0}")]
    InvalidUpstreamUri(String),

    #[error("error forwarding request upstream: {0}")]
    Transport(String),

    #[error("upstream responded with status {0}")]
    UpstreamStatus(StatusCode),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

/// The JSON body returned for every error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingCredential
            | RelayError::InvalidCredential
            | RelayError::InvalidUpstreamUri(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Body { status, .. } => *status,
            RelayError::InvalidJson(_) | RelayError::NotAnObjectOrArray => StatusCode::BAD_REQUEST,
            RelayError::Transport(_) | RelayError::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
            RelayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// The message callers see. Never includes configuration names, key material or upstream
    /// error text.
    pub fn public_message(&self) -> &'static str {
        match self {
            RelayError::MissingCredential
            | RelayError::InvalidCredential
            | RelayError::InvalidUpstreamUri(_) => "The relay is not configured correctly",
            RelayError::Body { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "Request body is too large"
            }
            RelayError::Body { .. } => "Request body could not be read",
            RelayError::InvalidJson(_) | RelayError::NotAnObjectOrArray => {
                "Request body must be valid JSON"
            }
            RelayError::Transport(_) | RelayError::UpstreamStatus(_) => {
                "Failed to fetch a response from the upstream service"
            }
            RelayError::Timeout(_) => "The upstream service took too long to respond",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}
