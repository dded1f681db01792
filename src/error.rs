// SPDX-License-Identifier: MIT

//! Application error types.
//!
//! Errors are split by concern: authentication, Harvest API access, and
//! setup-dialog validation. Handlers convert them into user-visible chat
//! messages; only the OAuth callback route turns them into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::store::StoreError;
use crate::transport::TransportError;

/// Authentication and OAuth session errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The OAuth state token was unknown, expired, or already consumed.
    #[error("unknown or already used state token")]
    UnknownState,

    /// The provider rejected the authorization-code exchange.
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    /// The provider rejected the refresh-token exchange.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// No stored credential for this user.
    #[error("user is not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Harvest API call errors.
///
/// These are caught at the call boundary and reported to the user as a
/// single chat message; they never escalate to a process-level fault.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure, non-2xx response, or JSON decode failure.
    #[error("Harvest request failed: {0}")]
    RequestFailed(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Setup-dialog validation errors. Reject the mutation, touch nothing.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("reminder window start {start} is after end {end}")]
    InvertedWindow {
        start: chrono::NaiveTime,
        end: chrono::NaiveTime,
    },

    #[error("could not parse time of day: {0:?}")]
    BadTime(String),

    #[error("could not parse number: {0:?}")]
    BadNumber(String),
}

/// Umbrella error for route handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The OAuth redirect endpoint answers with plain strings; the
        // browser tab is the only consumer.
        let (status, body) = match &self {
            AppError::Auth(AuthError::UnknownState) => (
                StatusCode::BAD_REQUEST,
                "This login link is no longer valid. Please start the login again.",
            ),
            AppError::Auth(_) => (
                StatusCode::BAD_GATEWAY,
                "There was a problem with the authentication, please try again.",
            ),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid request."),
            AppError::Api(_) => (StatusCode::BAD_GATEWAY, "Harvest could not be reached."),
            AppError::Store(e) => {
                tracing::error!(error = %e, "Store error in route handler");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error.")
            }
            AppError::Transport(e) => {
                tracing::error!(error = %e, "Transport error in route handler");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error.")
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error in route handler");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error.")
            }
        };

        (status, body).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
