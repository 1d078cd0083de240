//! # Bearer-token session
//!
//! The archive accepts a short-lived access token in the `Authorization`
//! header. Callers hand the client a long-lived refresh token once; the
//! [`Authenticator`] trades it for an access token and trades it again
//! whenever the access token has expired, right before the request that
//! needs it.
//!
//! Every refresh uses the refresh token the caller supplied, never one
//! rotated in by the authorization server.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{AuthenticationError, BoxError};
use crate::objects::Extra;

/// Upper bound on `expires_in`, so absurd values cannot overflow the clock.
const MAX_EXPIRES_IN_SECS: i64 = 365 * 24 * 60 * 60;

/// Something able to exchange a refresh token for a fresh token bundle.
///
/// [`OpenIdConnectSession`](crate::oidc::OpenIdConnectSession) is the
/// production implementation; tests plug in recording fakes.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, BoxError>;
}

/// Answer of the token endpoint: either a bundle or an error payload.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TokenResponse {
    Error(TokenErrorPayload),
    Bundle(TokenBundle),
}

/// Error payload of the token endpoint (`invalid_grant`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenErrorPayload {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl std::fmt::Display for TokenErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {description}", self.error),
            None => f.write_str(&self.error),
        }
    }
}

/// Successful answer of the token endpoint.
///
/// Custom `Debug` redacts both tokens.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenBundle {
    pub access_token: String,
    /// Lifetime of `access_token`, in seconds.
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires_in: Option<i64>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl std::fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .finish_non_exhaustive()
    }
}

/// The current access token and when it stops being usable.
pub(crate) struct AuthSession {
    access_token: Zeroizing<String>,
    /// Refresh token the server returned with the bundle. Kept for
    /// inspection only; refreshes always use the caller's token.
    refresh_token: Option<Zeroizing<String>>,
    expires_at: DateTime<Utc>,
}

impl AuthSession {
    fn from_bundle(bundle: TokenBundle, now: DateTime<Utc>) -> Self {
        let lifetime = bundle.expires_in.clamp(0, MAX_EXPIRES_IN_SECS);
        Self {
            access_token: Zeroizing::new(bundle.access_token),
            refresh_token: bundle.refresh_token.map(Zeroizing::new),
            expires_at: now + Duration::seconds(lifetime),
        }
    }

    pub(crate) fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub(crate) fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub(crate) fn server_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.as_str())
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

struct SessionState {
    user_refresh_token: Zeroizing<String>,
    session: AuthSession,
}

/// Holds at most one session and refreshes it lazily.
///
/// The state lock is held across a refresh so concurrent requests on an
/// expired session trigger a single exchange.
pub struct Authenticator {
    refresher: Arc<dyn TokenRefresher>,
    state: tokio::sync::Mutex<Option<SessionState>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            refresher,
            state: tokio::sync::Mutex::new(None),
        }
    }

    /// Exchange `refresh_token` for an access token and keep both.
    ///
    /// A failed exchange leaves any previous session untouched.
    pub async fn authenticate(&self, refresh_token: &str) -> Result<(), AuthenticationError> {
        let session = self.exchange(refresh_token).await?;
        tracing::info!(expires_at = %session.expires_at, "authenticated against the archive");
        *self.state.lock().await = Some(SessionState {
            user_refresh_token: Zeroizing::new(refresh_token.to_string()),
            session,
        });
        Ok(())
    }

    /// `Authorization` header for the next request, if a session is open.
    ///
    /// An expired session is refreshed first, with the original refresh
    /// token. If that refresh fails the error is returned and the request
    /// must not be sent.
    pub async fn bearer_header(&self) -> Result<Option<HeaderValue>, AuthenticationError> {
        let mut guard = self.state.lock().await;
        let Some(state) = guard.as_mut() else {
            return Ok(None);
        };

        if state.session.is_expired(Utc::now()) {
            tracing::debug!(
                expired_at = %state.session.expires_at,
                "access token expired, refreshing"
            );
            state.session = self.exchange(&state.user_refresh_token).await?;
        }

        let bearer = Zeroizing::new(format!("Bearer {}", state.session.access_token.as_str()));
        let mut value = HeaderValue::from_str(&bearer)
            .map_err(|_| AuthenticationError::InvalidAccessToken)?;
        value.set_sensitive(true);
        Ok(Some(value))
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Expiry of the current access token, if any.
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|s| s.session.expires_at())
    }

    /// Refresh token the server sent along with the current access token.
    /// Refreshes never use it.
    pub async fn server_refresh_token(&self) -> Option<Zeroizing<String>> {
        self.state
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.session.server_refresh_token())
            .map(|t| Zeroizing::new(t.to_string()))
    }

    async fn exchange(&self, refresh_token: &str) -> Result<AuthSession, AuthenticationError> {
        match self
            .refresher
            .refresh(refresh_token)
            .await
            .map_err(AuthenticationError::Refresh)?
        {
            TokenResponse::Bundle(bundle) => Ok(AuthSession::from_bundle(bundle, Utc::now())),
            TokenResponse::Error(payload) => Err(AuthenticationError::Rejected(payload)),
        }
    }
}
