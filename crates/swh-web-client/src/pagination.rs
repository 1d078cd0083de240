//! # Pagination cursor
//!
//! Large listings (snapshot branches, origin visits) are split into pages.
//! The archive announces the next page in a `Link` response header with
//! `rel="next"`; the cursor follows those links until none is left.
//!
//! Pages are fetched lazily: nothing is requested until the consumer asks
//! for the next page, and a consumer that stops early never triggers the
//! remaining requests.

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{HeaderMap, LINK};
use serde_json::Value;

use crate::error::WebApiError;
use crate::objects::{OriginVisit, SnapshotBranches};
use crate::WebApiClient;

/// Target of the `next` relation among the response's `Link` headers.
///
/// Accepts several headers and comma-separated link values, and `rel`
/// parameters listing several relation types.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(split_link_values)
        .find_map(|link| {
            let (target, params) = parse_link_value(link)?;
            params
                .iter()
                .any(|(name, value)| {
                    name.eq_ignore_ascii_case("rel")
                        && value
                            .split_whitespace()
                            .any(|rel| rel.eq_ignore_ascii_case("next"))
                })
                .then(|| target.to_string())
        })
}

/// Split a header into link values on commas outside `<...>`.
fn split_link_values(header: &str) -> Vec<&str> {
    let mut values = Vec::new();
    let mut in_target = false;
    let mut start = 0;
    for (i, c) in header.char_indices() {
        match c {
            '<' => in_target = true,
            '>' => in_target = false,
            ',' if !in_target => {
                values.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    values.push(&header[start..]);
    values
}

fn parse_link_value(link: &str) -> Option<(&str, Vec<(&str, String)>)> {
    let link = link.trim();
    let rest = link.strip_prefix('<')?;
    let (target, params) = rest.split_once('>')?;
    let params = params
        .split(';')
        .filter_map(|param| {
            let (name, value) = param.split_once('=')?;
            Some((name.trim(), value.trim().trim_matches('"').to_string()))
        })
        .collect();
    Some((target.trim(), params))
}

/// One page to fetch: a query (relative to the API root, or an absolute
/// URL taken from a `Link` header) and its query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageRequest {
    pub(crate) query: String,
    pub(crate) params: Vec<(String, String)>,
}

/// Lazy walk over the raw JSON pages of one listing.
#[derive(Debug)]
pub(crate) struct PageCursor<'a> {
    client: &'a WebApiClient,
    next: Option<PageRequest>,
}

impl<'a> PageCursor<'a> {
    pub(crate) fn new(client: &'a WebApiClient, first: PageRequest) -> Self {
        Self {
            client,
            next: Some(first),
        }
    }

    /// Fetch the next page, or `None` once the last page has been handed
    /// out. After an error the cursor is exhausted.
    pub(crate) async fn next_page(&mut self) -> Option<Result<Value, WebApiError>> {
        let request = self.next.take()?;
        match self.client.fetch_page(&request).await {
            Ok((body, following)) => {
                self.next = following.map(|query| PageRequest {
                    query,
                    params: Vec::new(),
                });
                Some(Ok(body))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// `true` once no further request will be issued.
    pub(crate) fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}

/// Pages of a listing, each decoded into `T`.
pub struct Pages<'a, T> {
    cursor: PageCursor<'a>,
    decode: fn(Value) -> Result<T, WebApiError>,
}

impl<T> std::fmt::Debug for Pages<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pages")
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Typed snapshot branches, one map per page.
pub type SnapshotPages<'a> = Pages<'a, SnapshotBranches>;

/// Typed origin visits, one list per page.
pub type VisitPages<'a> = Pages<'a, Vec<OriginVisit>>;

impl<'a, T: Send + 'a> Pages<'a, T> {
    pub(crate) fn new(
        cursor: PageCursor<'a>,
        decode: fn(Value) -> Result<T, WebApiError>,
    ) -> Self {
        Self { cursor, decode }
    }

    pub async fn next_page(&mut self) -> Option<Result<T, WebApiError>> {
        let page = self.cursor.next_page().await?;
        Some(page.and_then(self.decode))
    }

    /// `true` once the last page has been handed out, or after an error.
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }

    /// Drive the remaining pages as a stream. The stream ends after the
    /// last page or after the first error.
    pub fn into_stream(self) -> BoxStream<'a, Result<T, WebApiError>> {
        stream::unfold(Some(self), |pages| async move {
            let mut pages = pages?;
            match pages.next_page().await? {
                Ok(page) => Some((Ok(page), Some(pages))),
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }

    /// Fetch every remaining page.
    pub async fn collect_pages(mut self) -> Result<Vec<T>, WebApiError> {
        let mut out = Vec::new();
        while let Some(page) = self.next_page().await {
            out.push(page?);
        }
        Ok(out)
    }
}

impl<'a> SnapshotPages<'a> {
    /// Fetch every remaining page and merge the branches.
    ///
    /// Branch names are expected to be unique across pages; if one repeats,
    /// the later page wins.
    pub async fn merged(mut self) -> Result<SnapshotBranches, WebApiError> {
        let mut all = SnapshotBranches::new();
        while let Some(page) = self.next_page().await {
            for (name, branch) in page? {
                if let Some(previous) = all.insert(name, branch) {
                    tracing::warn!(
                        target_type = %previous.target_type,
                        "snapshot branch listed on several pages, keeping the later one"
                    );
                }
            }
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for v in values {
            map.append(LINK, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn finds_next_link() {
        let h = headers(&[
            "<https://archive.softwareheritage.org/api/1/snapshot/cabcc7d7bf639bbe1cc3b41989e1806618dd5764/?branches_from=refs/tags/v3.0.6>; rel=\"next\"",
        ]);
        assert_eq!(
            next_link(&h).as_deref(),
            Some("https://archive.softwareheritage.org/api/1/snapshot/cabcc7d7bf639bbe1cc3b41989e1806618dd5764/?branches_from=refs/tags/v3.0.6")
        );
    }

    #[test]
    fn picks_next_among_several_relations() {
        let h = headers(&["<http://a/?page=1>; rel=\"prev\", <http://a/?page=3>; rel=\"next\""]);
        assert_eq!(next_link(&h).as_deref(), Some("http://a/?page=3"));
    }

    #[test]
    fn next_in_a_relation_list() {
        let h = headers(&["<http://a/2>; rel=\"next last\""]);
        assert_eq!(next_link(&h).as_deref(), Some("http://a/2"));
    }

    #[test]
    fn comma_inside_target_is_not_a_separator() {
        let h = headers(&["<http://a/?q=x,y>; rel=next"]);
        assert_eq!(next_link(&h).as_deref(), Some("http://a/?q=x,y"));
    }

    #[test]
    fn across_multiple_headers() {
        let h = headers(&["<http://a/1>; rel=\"prev\"", "<http://a/3>; rel=\"next\""]);
        assert_eq!(next_link(&h).as_deref(), Some("http://a/3"));
    }

    #[test]
    fn no_next_relation() {
        assert_eq!(next_link(&headers(&["<http://a/1>; rel=\"prev\""])), None);
        assert_eq!(next_link(&HeaderMap::new()), None);
        assert_eq!(next_link(&headers(&["garbage"])), None);
    }
}
