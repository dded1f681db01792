// SPDX-License-Identifier: MIT

//! OAuth redirect endpoint.
//!
//! Harvest redirects the browser here with `code`, `scope`, and the
//! JSON-encoded `state` containing the opaque token minted by
//! `begin_login`. The response is a plain string for the browser tab.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::{AppError, AuthError, Result};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/oauth/callback", get(oauth_callback))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// JSON payload inside the `state` query parameter.
#[derive(Deserialize)]
struct StatePayload {
    token: String,
}

/// Complete the login and arm the user's token refresh check.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<&'static str> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from provider");
        return Err(AuthError::ExchangeFailed(error).into());
    }

    let payload: StatePayload = serde_json::from_str(&params.state)
        .map_err(|_| AppError::Auth(AuthError::UnknownState))?;

    let code = params
        .code
        .ok_or_else(|| AuthError::ExchangeFailed("missing authorization code".to_string()))?;

    let user_id = state
        .oauth
        .complete_login(&payload.token, &code, params.scope.as_deref())
        .await?;

    state.reminders.arm_refresh_check(&user_id);

    Ok("Authentication complete. You can close this window.")
}
