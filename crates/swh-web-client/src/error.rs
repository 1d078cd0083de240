//! Web API client error types.

use swh_core::{ObjectKind, Swhid, SwhidError};

use crate::auth::TokenErrorPayload;

/// Boxed error returned by pluggable collaborators (token refreshers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from archive web API calls.
#[derive(Debug, thiserror::Error)]
pub enum WebApiError {
    /// The identifier handed to the client did not parse.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] SwhidError),
    /// A per-kind routine was handed an identifier of another kind.
    #[error("{endpoint} expects a {expected} identifier, got {swhid}")]
    KindMismatch {
        endpoint: String,
        expected: ObjectKind,
        swhid: Swhid,
    },
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The archive returned a non-2xx status to a GET or POST.
    #[error("archive API {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response body was not the JSON shape expected.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Response body was not valid JSON.
    #[error("invalid JSON from {endpoint}: {source}")]
    Json {
        endpoint: String,
        source: serde_json::Error,
    },
    /// The JSON payload could not be converted into typed values.
    #[error("failed to type response from {endpoint}: {source}")]
    Typing {
        endpoint: String,
        source: TypingError,
    },
    /// Obtaining or refreshing the bearer token failed.
    #[error("authentication error: {0}")]
    Authentication(#[from] AuthenticationError),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Errors raised while converting a raw payload into typed values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypingError {
    /// A `target_type` named something that is not an archived object kind.
    #[error("unsupported object kind {0:?}")]
    UnsupportedObjectKind(String),
    /// A directory entry `type` other than `file`, `dir` or `rev`.
    #[error("invalid directory entry type: {0:?}")]
    InvalidDirectoryEntryType(String),
    /// A field was missing, had the wrong JSON shape, or held an invalid
    /// identifier or timestamp.
    #[error("malformed payload at {field}: {reason}")]
    MalformedPayload { field: String, reason: String },
}

impl TypingError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::MalformedPayload {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors from the bearer-token session.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    /// The refresh capability itself failed (transport error, bad response).
    #[error("token refresh failed: {0}")]
    Refresh(#[source] BoxError),
    /// The authorization server answered with an error payload.
    #[error("authorization server rejected the refresh token: {0}")]
    Rejected(TokenErrorPayload),
    /// The access token contains bytes not allowed in an HTTP header.
    #[error("access token is not a valid header value")]
    InvalidAccessToken,
}
