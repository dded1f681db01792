// SPDX-License-Identifier: MIT

//! OAuth2 session manager for the Harvest identity service.
//!
//! Drives the three-legged flow: authorization URL bound to a one-time
//! state token, code-for-tokens exchange, scheduled refresh, and logout.
//! Authentication failures wipe the user's stored state and prompt a
//! re-login over chat.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{MessageContent, UserCredential};
use crate::store::{fields, TokenStore};
use crate::transport::ChatTransport;

/// OAuth session manager.
#[derive(Clone)]
pub struct OAuthService {
    http: reqwest::Client,
    identity_url: String,
    client_id: String,
    client_secret: String,
    store: TokenStore,
    transport: Arc<dyn ChatTransport>,
}

/// Token endpoint response. Harvest reports provider errors in-body.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenEndpointResponse {
    fn into_result(self) -> Result<(String, String, i64), String> {
        if let Some(error) = self.error {
            return Err(self.error_description.unwrap_or(error));
        }
        match (self.access_token, self.refresh_token) {
            (Some(access), Some(refresh)) => {
                Ok((access, refresh, self.expires_in.unwrap_or(0)))
            }
            _ => Err("token endpoint returned no tokens".to_string()),
        }
    }
}

impl OAuthService {
    pub fn new(
        identity_url: String,
        client_id: String,
        client_secret: String,
        store: TokenStore,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            identity_url,
            client_id,
            client_secret,
            store,
            transport,
        }
    }

    // ─── Login Flow ──────────────────────────────────────────────────────

    /// Start a login: bind a fresh state token to the user and return the
    /// provider authorization URL. Existing credentials are untouched.
    pub async fn begin_login(&self, user_id: &str) -> Result<String, AuthError> {
        let state_token = Uuid::new_v4().to_string();
        self.store.put_pending_login(&state_token, user_id).await?;

        let state = serde_json::json!({ "token": state_token }).to_string();
        let url = format!(
            "{}/oauth2/authorize?client_id={}&response_type=code&state={}",
            self.identity_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&state),
        );

        tracing::info!(user_id = %user_id, "Login started");
        Ok(url)
    }

    /// Complete a login from the OAuth redirect.
    ///
    /// Consumes the pending login (a replayed or unknown state token fails
    /// with [`AuthError::UnknownState`]), exchanges the code, stores the
    /// credential, and notifies the user. A provider error wipes every key
    /// for the user.
    pub async fn complete_login(
        &self,
        state_token: &str,
        code: &str,
        scope: Option<&str>,
    ) -> Result<String, AuthError> {
        let user_id = self
            .store
            .take_pending_login(state_token)
            .await?
            .ok_or(AuthError::UnknownState)?;

        if let Some(scope) = scope {
            self.store.set_scope(&user_id, scope).await?;
        }

        let exchange = self
            .token_request(&[
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("grant_type", "authorization_code"),
            ])
            .await;

        let (access_token, refresh_token, expires_in) = match exchange {
            Ok(tokens) => tokens,
            Err(reason) => {
                tracing::warn!(user_id = %user_id, error = %reason, "Token exchange failed, wiping user");
                self.store.reset_user(&user_id).await?;
                return Err(AuthError::ExchangeFailed(reason));
            }
        };

        let credential = UserCredential {
            access_token,
            refresh_token,
            expires_in,
            scope: scope.map(|s| s.to_string()),
            logged_in_at: Utc::now(),
        };
        self.store.set_credential(&user_id, &credential).await?;

        tracing::info!(user_id = %user_id, "OAuth login complete");
        self.notify_authorized(&user_id).await;

        Ok(user_id)
    }

    /// The "authorized" event: confirm over chat, editing the original
    /// login-button message in place when its marker is still around.
    async fn notify_authorized(&self, user_id: &str) {
        let content = MessageContent::plain("You are now logged in to Harvest. :white_check_mark:");

        let marker = self
            .store
            .marker(user_id, fields::LOGIN_BUTTON_MESSAGE)
            .await
            .unwrap_or(None);

        let sent = match marker {
            Some(message_id) => {
                let message_ref = crate::transport::MessageRef(message_id);
                let updated = self.transport.update_message(&message_ref, &content).await;
                if updated.is_ok() {
                    let _ = self
                        .store
                        .delete_marker(user_id, fields::LOGIN_BUTTON_MESSAGE)
                        .await;
                }
                updated
            }
            None => self.transport.post_message(user_id, &content).await.map(|_| ()),
        };

        if let Err(e) = sent {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to send authorized message");
        }
    }

    // ─── Refresh ─────────────────────────────────────────────────────────

    /// Exchange the stored refresh token for a new access token.
    ///
    /// A provider error wipes the user's state and prompts a re-login; the
    /// scheduled check that calls this runs every 6 hours and only when the
    /// token is within the refresh margin.
    pub async fn refresh(&self, user_id: &str) -> Result<(), AuthError> {
        let credential = self
            .store
            .credential(user_id)
            .await?
            .ok_or(AuthError::NotAuthenticated)?;

        let exchange = self
            .token_request(&[
                ("refresh_token", &credential.refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("grant_type", "refresh_token"),
            ])
            .await;

        let (access_token, refresh_token, expires_in) = match exchange {
            Ok(tokens) => tokens,
            Err(reason) => {
                tracing::warn!(user_id = %user_id, error = %reason, "Token refresh failed, wiping user");
                self.store.reset_user(user_id).await?;
                self.send(
                    user_id,
                    "Your Harvest session expired and could not be renewed. Please log in again with `setup`.",
                )
                .await;
                return Err(AuthError::RefreshFailed(reason));
            }
        };

        let renewed = UserCredential {
            access_token,
            refresh_token,
            expires_in,
            scope: credential.scope,
            logged_in_at: Utc::now(),
        };
        self.store.set_credential(user_id, &renewed).await?;

        tracing::info!(user_id = %user_id, "Access token refreshed");
        Ok(())
    }

    // ─── Logout ──────────────────────────────────────────────────────────

    /// Wipe every stored key for the user and confirm over chat.
    pub async fn logout(&self, user_id: &str) -> Result<(), AuthError> {
        self.store.reset_user(user_id).await?;
        tracing::info!(user_id = %user_id, "User logged out");
        self.send(user_id, "You have been logged out of Harvest.").await;
        Ok(())
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    async fn token_request(
        &self,
        form: &[(&str, &str)],
    ) -> Result<(String, String, i64), String> {
        let response = self
            .http
            .post(format!("{}/api/v2/oauth2/token", self.identity_url))
            .form(form)
            .send()
            .await
            .map_err(|e| format!("token request failed: {}", e))?;

        let parsed: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|e| format!("token response parse error: {}", e))?;

        parsed.into_result()
    }

    /// Best-effort chat notification.
    async fn send(&self, user_id: &str, text: &str) {
        if let Err(e) = self
            .transport
            .post_message(user_id, &MessageContent::plain(text))
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to send chat message");
        }
    }
}
