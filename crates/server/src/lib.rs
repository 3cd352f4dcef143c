//! Voice Assistant Server
//!
//! WebSocket transport, HTTP endpoints, and process wiring.

pub mod http;
pub mod metrics;
pub mod session;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use metrics::{init_metrics, record_error, record_reply, record_transcript};
pub use session::SessionRegistry;
pub use state::{AppState, Collaborators};

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Session limit reached")]
    SessionLimit,

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Session(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::SessionLimit => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            ServerError::WebSocket(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
