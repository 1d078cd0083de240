//! # swh-cli — command-line client for the Software Heritage archive
//!
//! Provides the `swh-web` command-line interface on top of
//! [`swh_web_client`].
//!
//! ## Subcommands
//!
//! - `swh-web get` / `iter` — fetch an object by SWHID, typed or raw.
//! - `swh-web exists` — existence check.
//! - `swh-web raw` — stream content bytes to stdout.
//! - `swh-web visits` — list the visits of a software origin.
//! - `swh-web known` — ask which identifiers the archive holds.
//! - `swh-web auth` — obtain, refresh and revoke API tokens.
//!
//! ## Configuration
//!
//! Defaults come from the `SWH_*` environment variables read by
//! [`WebApiConfig::from_env`] and [`OidcConfig::from_env`]; the global
//! flags override them.
//!
//! ```bash
//! swh-web get swh:1:rel:b9db10d00835e9a43e2eebef2db1d04d4ae82342
//! swh-web -v --api-url http://localhost:5004/api/1 \
//!     iter swh:1:snp:cabcc7d7bf639bbe1cc3b41989e1806618dd5764
//! ```

pub mod archive;
pub mod auth;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use url::Url;
use zeroize::Zeroizing;

use swh_web_client::{OidcConfig, OpenIdConnectSession, WebApiClient, WebApiConfig};

/// Connection flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Root of the archive API (default: `SWH_API_URL` or the public archive).
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<Url>,

    /// Refresh token used to authenticate API calls (default: `SWH_REFRESH_TOKEN`).
    #[arg(long, global = true, value_name = "TOKEN")]
    pub refresh_token: Option<String>,

    /// Per-request timeout in seconds (default: `SWH_TIMEOUT_SECS` or 30).
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl ConnectionArgs {
    /// Environment configuration with the flags laid on top.
    pub fn web_config(&self) -> Result<WebApiConfig> {
        let env = WebApiConfig::from_env()
            .context("invalid SWH_* environment")?;
        Ok(self.overlay(env))
    }

    fn overlay(&self, mut config: WebApiConfig) -> WebApiConfig {
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(token) = &self.refresh_token {
            config.refresh_token = Some(Zeroizing::new(token.clone()));
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        config
    }

    /// OpenID Connect session for the configured realm.
    pub fn oidc_session(&self) -> Result<OpenIdConnectSession> {
        let mut config = OidcConfig::from_env()
            .context("invalid SWH_AUTH_* environment")?;
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        OpenIdConnectSession::new(config)
            .context("failed to build the OpenID Connect client")
    }

    /// Build the API client, opening the session when a refresh token is
    /// configured.
    pub async fn connect(&self) -> Result<WebApiClient> {
        let config = self.web_config()?;
        tracing::debug!(?config, "connecting to the archive");
        let refresher = Arc::new(self.oidc_session()?);
        WebApiClient::connect(config, refresher)
            .await
            .context("failed to open an authenticated session")
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}

/// Print `value` as one line of JSON on stdout.
pub fn print_json_line<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string(value)
        .context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_keeps_environment_values_without_flags() {
        let base = WebApiConfig::with_api_url("https://archive.example.org/api/1").unwrap();
        let config = ConnectionArgs::default().overlay(base);
        assert_eq!(config.api_url.as_str(), "https://archive.example.org/api/1");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.refresh_token.is_none());
    }

    #[test]
    fn overlay_applies_flags() {
        let base = WebApiConfig::with_api_url("https://archive.example.org/api/1").unwrap();
        let args = ConnectionArgs {
            api_url: Some("http://localhost:5004/api/1".parse().unwrap()),
            refresh_token: Some("flag-token".into()),
            timeout: Some(5),
        };
        let config = args.overlay(base);
        assert_eq!(config.api_url.as_str(), "http://localhost:5004/api/1");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(
            config.refresh_token.as_deref().map(String::as_str),
            Some("flag-token")
        );
    }
}
