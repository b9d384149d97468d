//! Error types and error handling
//!
//! Handlers return `Result<_, AppError>` and propagate with `?`. Client
//! errors map to their status code with the status text as the body; every
//! other variant is logged with a backtrace and answered with a generic 500.
//! Validation failures never reach this type: handlers re-render the form.

use crate::models::ModelError;
use crate::session::SessionError;
use crate::template::TemplateError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::backtrace::Backtrace;
use thiserror::Error;

/// Handler error
#[derive(Debug, Error)]
pub enum AppError {
    /// Unknown resource (404)
    #[error("not found")]
    NotFound,

    /// Malformed request (400)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Template lookup or rendering failed
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Session load, save or renewal failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Store failure; [`ModelError::NoRecord`] is treated as 404
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Any other server-side failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Status code sent for this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::Model(ModelError::NoRecord) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            server_error(&self)
        } else {
            if let Self::BadRequest(reason) = &self {
                tracing::debug!(%reason, "rejected malformed request");
            }
            client_error(status)
        }
    }
}

/// Plain-text response carrying the status text as its body.
#[must_use]
pub fn client_error(status: StatusCode) -> Response {
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}

/// Log `error` with a backtrace and answer with a generic 500.
pub fn server_error(error: &dyn std::error::Error) -> Response {
    let trace = Backtrace::force_capture();
    tracing::error!(error = %error, backtrace = %trace, "internal server error");
    client_error(StatusCode::INTERNAL_SERVER_ERROR)
}
