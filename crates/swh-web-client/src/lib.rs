//! # swh-web-client -- Typed Rust client for the Software Heritage web API
//!
//! Retrieves archived objects by persistent identifier (SWHID) and hands
//! them back as typed values rather than raw JSON:
//!
//! - **Contents** via `content/sha1_git:<hex>/` (metadata) and `.../raw/` (bytes)
//! - **Directories** via `directory/<hex>/`
//! - **Revisions** via `revision/<hex>/`
//! - **Releases** via `release/<hex>/`
//! - **Snapshots** via `snapshot/<hex>/`, paginated through `Link` headers
//! - **Origin visits** via `origin/<url>/visits/`, paginated likewise
//!
//! ## Architecture
//!
//! [`WebApiClient`] dispatches on the identifier's kind, issues the HTTP
//! calls, and runs each payload through the [`typing`] engine. Paginated
//! listings are walked lazily by the [`pagination`] cursor. When a refresh
//! token is configured, the [`auth`] session injects a bearer token into
//! every request and refreshes it once expired.
//!
//! ## URL convention
//!
//! Relative queries are joined to the API root with `/`:
//! `{api_url}/{query}`. Absolute URLs (the targets of `Link` headers) are
//! requested verbatim.

pub mod auth;
pub mod config;
pub mod error;
pub mod objects;
pub mod oidc;
pub mod pagination;
pub mod typing;

pub use auth::{Authenticator, TokenBundle, TokenErrorPayload, TokenRefresher, TokenResponse};
pub use config::WebApiConfig;
pub use error::{AuthenticationError, TypingError, WebApiError};
pub use objects::ArchiveObject;
pub use oidc::{OidcConfig, OpenIdConnectSession};
pub use pagination::{Pages, SnapshotPages, VisitPages};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use swh_core::{ObjectKind, Swhid, SwhidError};

use objects::{Content, DirectoryEntry, Release, Revision, SnapshotBranches};
use pagination::{PageCursor, PageRequest};

/// Anything that names an archived object: a parsed [`Swhid`] or its
/// textual form, parsed on the way in.
pub trait IntoSwhid {
    fn into_swhid(self) -> Result<Swhid, SwhidError>;
}

impl IntoSwhid for Swhid {
    fn into_swhid(self) -> Result<Swhid, SwhidError> {
        Ok(self)
    }
}

impl IntoSwhid for &Swhid {
    fn into_swhid(self) -> Result<Swhid, SwhidError> {
        Ok(*self)
    }
}

impl IntoSwhid for &str {
    fn into_swhid(self) -> Result<Swhid, SwhidError> {
        self.parse()
    }
}

impl IntoSwhid for String {
    fn into_swhid(self) -> Result<Swhid, SwhidError> {
        self.parse()
    }
}

impl IntoSwhid for &String {
    fn into_swhid(self) -> Result<Swhid, SwhidError> {
        self.parse()
    }
}

/// Client of the archive web API.
#[derive(Debug)]
pub struct WebApiClient {
    http: reqwest::Client,
    api_url: String,
    auth: Authenticator,
}

impl WebApiClient {
    /// Create a client whose token refreshes go to the realm described by
    /// the `SWH_AUTH_*` environment variables.
    ///
    /// No network call is made; see [`WebApiClient::connect`] to also open
    /// the session for `config.refresh_token`.
    pub fn new(config: WebApiConfig) -> Result<Self, WebApiError> {
        let oidc = OpenIdConnectSession::new(OidcConfig::from_env()?)?;
        Self::with_refresher(config, Arc::new(oidc))
    }

    /// Create a client that refreshes its tokens through `refresher`.
    pub fn with_refresher(
        config: WebApiConfig,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Result<Self, WebApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WebApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            api_url: config.api_url.as_str().trim_end_matches('/').to_string(),
            auth: Authenticator::new(refresher),
        })
    }

    /// Create a client and, if `config` carries a refresh token, open the
    /// authenticated session before returning.
    pub async fn connect(
        config: WebApiConfig,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Result<Self, WebApiError> {
        let refresh_token = config.refresh_token.clone();
        let client = Self::with_refresher(config, refresher)?;
        if let Some(token) = refresh_token {
            client.authenticate(&token).await?;
        }
        Ok(client)
    }

    /// Open (or replace) the authenticated session.
    pub async fn authenticate(&self, refresh_token: &str) -> Result<(), WebApiError> {
        Ok(self.auth.authenticate(refresh_token).await?)
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// API root, without trailing slash.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // -- Façade ---------------------------------------------------------------

    /// Retrieve any object as a typed value. Snapshots are fetched page by
    /// page and merged.
    pub async fn get(&self, id: impl IntoSwhid) -> Result<ArchiveObject, WebApiError> {
        let swhid = id.into_swhid()?;
        Ok(match swhid.kind() {
            ObjectKind::Content => ArchiveObject::Content(self.content(swhid).await?),
            ObjectKind::Directory => ArchiveObject::Directory(self.directory(swhid).await?),
            ObjectKind::Revision => ArchiveObject::Revision(self.revision(swhid).await?),
            ObjectKind::Release => ArchiveObject::Release(self.release(swhid).await?),
            ObjectKind::Snapshot => ArchiveObject::Snapshot(self.snapshot(swhid)?.merged().await?),
        })
    }

    /// Retrieve any object as the JSON the archive sent. For snapshots this
    /// is the merged `branches` mapping of every page.
    pub async fn get_raw(&self, id: impl IntoSwhid) -> Result<Value, WebApiError> {
        let swhid = id.into_swhid()?;
        if swhid.kind() != ObjectKind::Snapshot {
            return self.get_json(&object_path(&swhid)).await;
        }

        let mut pages = self.snapshot_raw(swhid)?;
        let mut merged = serde_json::Map::new();
        while let Some(page) = pages.next_page().await {
            if let Value::Object(branches) = page? {
                merged.extend(branches);
            }
        }
        Ok(Value::Object(merged))
    }

    /// Lazily retrieve an object: one element per snapshot page, a single
    /// element for every other kind.
    pub fn iter<'a>(
        &'a self,
        id: impl IntoSwhid,
    ) -> BoxStream<'a, Result<ArchiveObject, WebApiError>> {
        let swhid = match id.into_swhid() {
            Ok(swhid) => swhid,
            Err(e) => {
                let e = WebApiError::from(e);
                return stream::once(async move { Err::<ArchiveObject, _>(e) })
                    .boxed();
            }
        };
        match swhid.kind() {
            ObjectKind::Snapshot => match self.snapshot(swhid) {
                Ok(pages) => pages
                    .into_stream()
                    .map(|page| page.map(ArchiveObject::Snapshot))
                    .boxed(),
                Err(e) => {
                    stream::once(async move { Err::<ArchiveObject, _>(e) }).boxed()
                }
            },
            _ => stream::once(self.get(swhid)).boxed(),
        }
    }

    // -- Per-kind retrieval ---------------------------------------------------

    pub async fn content(&self, id: impl IntoSwhid) -> Result<Content, WebApiError> {
        let swhid = expect_kind(id, ObjectKind::Content, "content")?;
        self.get_typed(&object_path(&swhid), typing::retype_content)
            .await
    }

    pub async fn directory(
        &self,
        id: impl IntoSwhid,
    ) -> Result<Vec<DirectoryEntry>, WebApiError> {
        let swhid = expect_kind(id, ObjectKind::Directory, "directory")?;
        self.get_typed(&object_path(&swhid), typing::retype_directory)
            .await
    }

    pub async fn revision(&self, id: impl IntoSwhid) -> Result<Revision, WebApiError> {
        let swhid = expect_kind(id, ObjectKind::Revision, "revision")?;
        self.get_typed(&object_path(&swhid), typing::retype_revision)
            .await
    }

    pub async fn release(&self, id: impl IntoSwhid) -> Result<Release, WebApiError> {
        let swhid = expect_kind(id, ObjectKind::Release, "release")?;
        self.get_typed(&object_path(&swhid), typing::retype_release)
            .await
    }

    /// Typed branches of a snapshot, one page at a time. Nothing is
    /// requested until the first page is asked for.
    pub fn snapshot(&self, id: impl IntoSwhid) -> Result<SnapshotPages<'_>, WebApiError> {
        let swhid = expect_kind(id, ObjectKind::Snapshot, "snapshot")?;
        Ok(Pages::new(
            self.cursor(object_path(&swhid), Vec::new()),
            typed_branches,
        ))
    }

    /// Raw `branches` mapping of a snapshot, one page at a time.
    pub fn snapshot_raw(&self, id: impl IntoSwhid) -> Result<Pages<'_, Value>, WebApiError> {
        let swhid = expect_kind(id, ObjectKind::Snapshot, "snapshot")?;
        Ok(Pages::new(
            self.cursor(object_path(&swhid), Vec::new()),
            raw_branches,
        ))
    }

    // -- Existence checks -----------------------------------------------------

    pub async fn content_exists(&self, id: impl IntoSwhid) -> Result<bool, WebApiError> {
        self.exists_as(id, ObjectKind::Content, "content_exists")
            .await
    }

    pub async fn directory_exists(&self, id: impl IntoSwhid) -> Result<bool, WebApiError> {
        self.exists_as(id, ObjectKind::Directory, "directory_exists")
            .await
    }

    pub async fn revision_exists(&self, id: impl IntoSwhid) -> Result<bool, WebApiError> {
        self.exists_as(id, ObjectKind::Revision, "revision_exists")
            .await
    }

    pub async fn release_exists(&self, id: impl IntoSwhid) -> Result<bool, WebApiError> {
        self.exists_as(id, ObjectKind::Release, "release_exists")
            .await
    }

    pub async fn snapshot_exists(&self, id: impl IntoSwhid) -> Result<bool, WebApiError> {
        self.exists_as(id, ObjectKind::Snapshot, "snapshot_exists")
            .await
    }

    /// Existence check dispatched on the identifier's kind.
    pub async fn exists(&self, id: impl IntoSwhid) -> Result<bool, WebApiError> {
        let swhid = id.into_swhid()?;
        self.head_ok(&object_path(&swhid)).await
    }

    async fn exists_as(
        &self,
        id: impl IntoSwhid,
        kind: ObjectKind,
        endpoint: &str,
    ) -> Result<bool, WebApiError> {
        let swhid = expect_kind(id, kind, endpoint)?;
        self.head_ok(&object_path(&swhid)).await
    }

    // -- Other endpoints ------------------------------------------------------

    /// Raw bytes of a content, as the transport delivers them.
    ///
    /// The status is checked before the stream is returned; the body is
    /// read only as the stream is polled.
    pub async fn content_raw(
        &self,
        id: impl IntoSwhid,
    ) -> Result<BoxStream<'static, Result<Bytes, WebApiError>>, WebApiError> {
        let swhid = expect_kind(id, ObjectKind::Content, "content_raw")?;
        let query = format!("{}raw/", object_path(&swhid));
        let (endpoint, resp) = self.call(Method::GET, &query, &[], None).await?;
        let resp = ensure_success(endpoint.clone(), resp).await?;
        Ok(resp
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|e| WebApiError::Http {
                    endpoint: endpoint.clone(),
                    source: e,
                })
            })
            .boxed())
    }

    /// Visits of a software origin, most recent first, one page at a time.
    ///
    /// `per_page` and `last_visit` only apply to the first request; later
    /// pages follow the server's links.
    pub fn visits(
        &self,
        origin_url: &str,
        per_page: Option<u32>,
        last_visit: Option<u64>,
    ) -> VisitPages<'_> {
        let mut params = Vec::new();
        if let Some(n) = per_page {
            params.push(("per_page".to_string(), n.to_string()));
        }
        if let Some(v) = last_visit {
            params.push(("last_visit".to_string(), v.to_string()));
        }
        Pages::new(
            self.cursor(format!("origin/{origin_url}/visits/"), params),
            typed_visits,
        )
    }

    /// Which of `ids` the archive holds.
    pub async fn known<I>(&self, ids: I) -> Result<BTreeMap<Swhid, bool>, WebApiError>
    where
        I: IntoIterator,
        I::Item: IntoSwhid,
    {
        #[derive(Deserialize)]
        struct Known {
            known: bool,
        }

        let ids = ids
            .into_iter()
            .map(|id| id.into_swhid().map(|s| s.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        let body = serde_json::to_value(&ids).map_err(|source| WebApiError::Json {
            endpoint: "known/".into(),
            source,
        })?;

        let (endpoint, resp) = self.call(Method::POST, "known/", &[], Some(&body)).await?;
        let resp = ensure_success(endpoint.clone(), resp).await?;
        let answers: BTreeMap<String, Known> = resp
            .json()
            .await
            .map_err(|e| WebApiError::Deserialization {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        answers
            .into_iter()
            .map(|(id, answer)| {
                let swhid = id.parse::<Swhid>().map_err(|e| WebApiError::Typing {
                    endpoint: endpoint.clone(),
                    source: TypingError::malformed("known", e),
                })?;
                Ok((swhid, answer.known))
            })
            .collect()
    }

    // -- Transport ------------------------------------------------------------

    fn cursor(&self, query: String, params: Vec<(String, String)>) -> PageCursor<'_> {
        PageCursor::new(self, PageRequest { query, params })
    }

    fn url_for(&self, query: &str) -> String {
        if query.starts_with("http://") || query.starts_with("https://") {
            query.to_string()
        } else {
            format!("{}/{}", self.api_url, query)
        }
    }

    /// Send one request, exactly once, with the session header, if any.
    /// Returns the resolved URL alongside the response, whatever its status.
    async fn call(
        &self,
        method: Method,
        query: &str,
        params: &[(String, String)],
        json: Option<&Value>,
    ) -> Result<(String, reqwest::Response), WebApiError> {
        let url = self.url_for(query);
        let bearer = self.auth.bearer_header().await?;
        tracing::debug!(
            method = %method,
            url = %url,
            authenticated = bearer.is_some(),
            "archive API request"
        );

        let mut req = self.http.request(method, &url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(value) = bearer {
            req = req.header(AUTHORIZATION, value);
        }
        if let Some(body) = json {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(|e| WebApiError::Http {
            endpoint: url.clone(),
            source: e,
        })?;

        Ok((url, resp))
    }

    async fn get_json(&self, query: &str) -> Result<Value, WebApiError> {
        let (endpoint, resp) = self.call(Method::GET, query, &[], None).await?;
        let resp = ensure_success(endpoint.clone(), resp).await?;
        resp.json()
            .await
            .map_err(|e| WebApiError::Deserialization {
                endpoint,
                source: e,
            })
    }

    async fn get_typed<T>(
        &self,
        query: &str,
        retype: fn(Value) -> Result<T, TypingError>,
    ) -> Result<T, WebApiError> {
        let raw = self.get_json(query).await?;
        retype(raw).map_err(|source| WebApiError::Typing {
            endpoint: self.url_for(query),
            source,
        })
    }

    async fn head_ok(&self, query: &str) -> Result<bool, WebApiError> {
        let (_, resp) = self.call(Method::HEAD, query, &[], None).await?;
        Ok(resp.status().as_u16() < 400)
    }

    /// GET one page; returns its body and the `rel="next"` target, if any.
    pub(crate) async fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Result<(Value, Option<String>), WebApiError> {
        let (endpoint, resp) = self
            .call(Method::GET, &request.query, &request.params, None)
            .await?;
        let resp = ensure_success(endpoint.clone(), resp).await?;
        let next = pagination::next_link(resp.headers());
        let body = resp
            .json()
            .await
            .map_err(|e| WebApiError::Deserialization {
                endpoint,
                source: e,
            })?;
        Ok((body, next))
    }
}

/// Path of an object relative to the API root.
fn object_path(swhid: &Swhid) -> String {
    match swhid.kind() {
        ObjectKind::Content => format!("content/sha1_git:{}/", swhid.object_id_hex()),
        kind => format!("{}/{}/", kind.name(), swhid.object_id_hex()),
    }
}

fn expect_kind(
    id: impl IntoSwhid,
    expected: ObjectKind,
    endpoint: &str,
) -> Result<Swhid, WebApiError> {
    let swhid = id.into_swhid()?;
    if swhid.kind() != expected {
        return Err(WebApiError::KindMismatch {
            endpoint: endpoint.to_string(),
            expected,
            swhid,
        });
    }
    Ok(swhid)
}

async fn ensure_success(
    endpoint: String,
    resp: reqwest::Response,
) -> Result<reqwest::Response, WebApiError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(WebApiError::ApiError {
        endpoint,
        status,
        body,
    })
}

fn raw_branches(mut page: Value) -> Result<Value, WebApiError> {
    match page.get_mut("branches").map(Value::take) {
        Some(branches @ Value::Object(_)) => Ok(branches),
        _ => Err(WebApiError::Typing {
            endpoint: "snapshot".into(),
            source: TypingError::malformed("snapshot.branches", "missing or not an object"),
        }),
    }
}

fn typed_branches(page: Value) -> Result<SnapshotBranches, WebApiError> {
    let branches = raw_branches(page)?;
    typing::retype_snapshot_branches(branches).map_err(|source| WebApiError::Typing {
        endpoint: "snapshot".into(),
        source,
    })
}

fn typed_visits(page: Value) -> Result<Vec<objects::OriginVisit>, WebApiError> {
    typing::retype_visits(page).map_err(|source| WebApiError::Typing {
        endpoint: "visits".into(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "fe95a46679d128ff167b7c55df5d02356c5a1ae1";

    fn client(api_url: &str) -> WebApiClient {
        let cfg = WebApiConfig::with_api_url(api_url).unwrap();
        let oidc_config = OidcConfig::with_server_url("http://127.0.0.1:1/").unwrap();
        let oidc = OpenIdConnectSession::new(oidc_config).unwrap();
        WebApiClient::with_refresher(cfg, Arc::new(oidc)).unwrap()
    }

    #[test]
    fn object_paths() {
        let hex_id = HEX;
        let cases = [
            (ObjectKind::Content, format!("content/sha1_git:{hex_id}/")),
            (ObjectKind::Directory, format!("directory/{hex_id}/")),
            (ObjectKind::Revision, format!("revision/{hex_id}/")),
            (ObjectKind::Release, format!("release/{hex_id}/")),
            (ObjectKind::Snapshot, format!("snapshot/{hex_id}/")),
        ];
        for (kind, expected) in cases {
            let swhid = Swhid::from_hex(kind, HEX).unwrap();
            assert_eq!(object_path(&swhid), expected);
        }
    }

    #[test]
    fn relative_queries_join_with_slash() {
        let c = client("https://archive.softwareheritage.org/api/1/");
        assert_eq!(c.api_url(), "https://archive.softwareheritage.org/api/1");
        assert_eq!(
            c.url_for("release/b9db10d00835e9a43e2eebef2db1d04d4ae82342/"),
            "https://archive.softwareheritage.org/api/1/release/b9db10d00835e9a43e2eebef2db1d04d4ae82342/"
        );
    }

    #[test]
    fn absolute_queries_are_verbatim() {
        let c = client("https://archive.softwareheritage.org/api/1");
        let next = "https://mirror.example.org/api/1/snapshot/x/?branches_from=refs/tags/v1";
        assert_eq!(c.url_for(next), next);
    }

    #[test]
    fn expect_kind_rejects_other_kinds() {
        let err =
            expect_kind(format!("swh:1:dir:{HEX}"), ObjectKind::Content, "content").unwrap_err();
        assert!(matches!(
            err,
            WebApiError::KindMismatch { expected: ObjectKind::Content, swhid, .. }
                if swhid.kind() == ObjectKind::Directory
        ));
    }

    #[test]
    fn expect_kind_rejects_unparsable_text() {
        assert!(matches!(
            expect_kind("swh:1:cnt:nope", ObjectKind::Content, "content"),
            Err(WebApiError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn raw_branches_requires_branches_object() {
        let page = serde_json::json!({"id": HEX, "branches": {"HEAD": {"target": "refs/heads/master", "target_type": "alias"}}});
        assert!(raw_branches(page).unwrap().get("HEAD").is_some());
        assert!(raw_branches(serde_json::json!({"id": HEX})).is_err());
    }

    #[test]
    fn snapshot_pages_are_lazy() {
        let c = client("http://127.0.0.1:1");
        let pages = c.snapshot(format!("swh:1:snp:{HEX}")).unwrap();
        // Building the cursor performs no request; an unreachable host is fine.
        drop(pages);
    }
}
