//! # OpenID Connect token endpoint
//!
//! Software Heritage delegates authentication to a Keycloak realm. This
//! module talks to its OpenID Connect endpoints:
//!
//! - `login`: password grant, returns a bundle with an offline refresh token;
//! - `refresh`: refresh-token grant, returns a fresh access token;
//! - `logout`: revokes a refresh token.
//!
//! [`OpenIdConnectSession`] also implements [`TokenRefresher`], which is how
//! [`WebApiClient`](crate::WebApiClient) refreshes its bearer token.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::auth::{TokenRefresher, TokenResponse};
use crate::config::{env_url, ConfigError, DEFAULT_TIMEOUT_SECS};
use crate::error::{BoxError, WebApiError};

/// Keycloak server of the public archive.
pub const DEFAULT_AUTH_URL: &str = "https://auth.softwareheritage.org/auth/";
pub const DEFAULT_REALM: &str = "SoftwareHeritage";
pub const DEFAULT_CLIENT_ID: &str = "swh-web";

/// Where and as whom to talk to the authorization server.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Keycloak root, ending with `/`.
    pub server_url: Url,
    pub realm: String,
    pub client_id: String,
    pub timeout_secs: u64,
}

impl OidcConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SWH_AUTH_URL` (default: `https://auth.softwareheritage.org/auth/`)
    /// - `SWH_AUTH_REALM` (default: `SoftwareHeritage`)
    /// - `SWH_AUTH_CLIENT_ID` (default: `swh-web`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server_url: env_url("SWH_AUTH_URL", DEFAULT_AUTH_URL)?,
            realm: std::env::var("SWH_AUTH_REALM")
                .unwrap_or_else(|_| DEFAULT_REALM.to_string()),
            client_id: std::env::var("SWH_AUTH_CLIENT_ID")
                .unwrap_or_else(|_| DEFAULT_CLIENT_ID.to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Defaults of the public archive, pointed at `server_url`.
    pub fn with_server_url(server_url: &str) -> Result<Self, ConfigError> {
        let server_url = Url::parse(server_url)
            .map_err(|e| ConfigError::InvalidUrl("server_url".to_string(), e.to_string()))?;
        Ok(Self {
            server_url,
            realm: DEFAULT_REALM.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{name}",
            self.server_url.as_str().trim_end_matches('/'),
            self.realm
        )
    }
}

/// Client of the realm's OpenID Connect endpoints.
#[derive(Debug, Clone)]
pub struct OpenIdConnectSession {
    http: reqwest::Client,
    config: OidcConfig,
}

impl OpenIdConnectSession {
    pub fn new(config: OidcConfig) -> Result<Self, WebApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WebApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    /// Password grant. The `offline_access` scope makes the returned
    /// refresh token long-lived.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, WebApiError> {
        tracing::info!(username, realm = %self.config.realm, "requesting offline token");
        self.token_request(&[
            ("grant_type", "password"),
            ("client_id", &self.config.client_id),
            ("scope", "openid offline_access"),
            ("username", username),
            ("password", password),
        ])
        .await
    }

    /// Refresh-token grant.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, WebApiError> {
        tracing::debug!(realm = %self.config.realm, "refreshing access token");
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("client_id", &self.config.client_id),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    /// Revoke `refresh_token`.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), WebApiError> {
        let endpoint = self.config.endpoint("logout");
        let resp = self
            .http
            .post(&endpoint)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| WebApiError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(WebApiError::ApiError {
                endpoint,
                status,
                body,
            });
        }
        tracing::info!(realm = %self.config.realm, "refresh token revoked");
        Ok(())
    }

    /// POST a form to the token endpoint.
    ///
    /// Keycloak answers rejected grants with a 4xx and a JSON error
    /// payload; those come back as [`TokenResponse::Error`]. Anything else
    /// that is not a 2xx is an [`WebApiError::ApiError`].
    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, WebApiError> {
        let endpoint = self.config.endpoint("token");
        let resp = self
            .http
            .post(&endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| WebApiError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| WebApiError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(WebApiError::ApiError {
                endpoint,
                status: status.as_u16(),
                body,
            }),
            Err(source) => Err(WebApiError::Json { endpoint, source }),
        }
    }
}

#[async_trait]
impl TokenRefresher for OpenIdConnectSession {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, BoxError> {
        OpenIdConnectSession::refresh(self, refresh_token)
            .await
            .map_err(|e| Box::new(e) as BoxError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_realm_path() {
        let cfg = OidcConfig::with_server_url("https://auth.example.org/auth/").unwrap();
        assert_eq!(
            cfg.endpoint("token"),
            "https://auth.example.org/auth/realms/SoftwareHeritage/protocol/openid-connect/token"
        );
    }

    #[test]
    fn endpoint_without_trailing_slash() {
        let cfg = OidcConfig::with_server_url("http://127.0.0.1:8080").unwrap();
        assert_eq!(
            cfg.endpoint("logout"),
            "http://127.0.0.1:8080/realms/SoftwareHeritage/protocol/openid-connect/logout"
        );
    }

    #[test]
    fn defaults_name_the_public_realm() {
        let cfg = OidcConfig::with_server_url(DEFAULT_AUTH_URL).unwrap();
        assert_eq!(cfg.realm, "SoftwareHeritage");
        assert_eq!(cfg.client_id, "swh-web");
    }
}
