//! # Auth subcommand
//!
//! Token management against the archive's OpenID Connect realm:
//!
//! - `login` trades a username and password for an offline refresh token;
//! - `refresh` trades a refresh token for a short-lived access token;
//! - `logout` revokes a refresh token.

use std::io::BufRead;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use swh_web_client::{OpenIdConnectSession, TokenResponse};

use crate::print_json;

/// Arguments for the `swh-web auth` subcommand.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Obtain an offline refresh token. The password is read from
    /// `SWH_PASSWORD`, or from the first line of stdin.
    Login { username: String },

    /// Print a fresh access token (as a JSON string).
    Refresh {
        #[arg(value_name = "REFRESH_TOKEN")]
        refresh_token: String,
    },

    /// Revoke a refresh token.
    Logout {
        #[arg(value_name = "REFRESH_TOKEN")]
        refresh_token: String,
    },
}

/// Execute the auth subcommand.
pub async fn run_auth(args: &AuthArgs, oidc: &OpenIdConnectSession) -> Result<u8> {
    match &args.command {
        AuthCommand::Login { username } => cmd_login(oidc, username).await,
        AuthCommand::Refresh { refresh_token } => cmd_refresh(oidc, refresh_token).await,
        AuthCommand::Logout { refresh_token } => cmd_logout(oidc, refresh_token).await,
    }
}

async fn cmd_login(oidc: &OpenIdConnectSession, username: &str) -> Result<u8> {
    let password = read_password()?;
    match oidc
        .login(username, &password)
        .await
        .context("login request failed")?
    {
        TokenResponse::Bundle(bundle) => {
            print_json(&bundle)?;
            Ok(0)
        }
        TokenResponse::Error(payload) => bail!("login rejected: {payload}"),
    }
}

async fn cmd_refresh(oidc: &OpenIdConnectSession, refresh_token: &str) -> Result<u8> {
    match oidc
        .refresh(refresh_token)
        .await
        .context("token refresh request failed")?
    {
        TokenResponse::Bundle(bundle) => {
            print_json(&bundle.access_token)?;
            Ok(0)
        }
        TokenResponse::Error(payload) => bail!("refresh rejected: {payload}"),
    }
}

async fn cmd_logout(oidc: &OpenIdConnectSession, refresh_token: &str) -> Result<u8> {
    oidc.logout(refresh_token)
        .await
        .context("logout request failed")?;
    println!("OK: refresh token revoked");
    Ok(0)
}

fn read_password() -> Result<zeroize::Zeroizing<String>> {
    if let Ok(password) = std::env::var("SWH_PASSWORD") {
        return Ok(zeroize::Zeroizing::new(password));
    }
    let mut line = zeroize::Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read the password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("no password given: set SWH_PASSWORD or pipe it on stdin");
    }
    Ok(zeroize::Zeroizing::new(password.to_string()))
}
