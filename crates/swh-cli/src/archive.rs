//! # Archive subcommands
//!
//! Read-only queries against the archive: object retrieval, existence
//! checks, raw content download, origin visits, and `known/` lookups.
//! Objects are printed as JSON with identifiers rendered as SWHIDs.

use anyhow::{Context, Result};
use clap::Args;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use swh_core::Swhid;
use swh_web_client::WebApiClient;

use crate::{print_json, print_json_line};

/// Arguments for `swh-web get`.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Identifier of the object, e.g. `swh:1:rev:aafb16d69fd30ff58afdd69036a26047f3aebdc6`.
    pub swhid: Swhid,
    /// Print the payload exactly as the archive sent it.
    #[arg(long)]
    pub raw: bool,
}

/// Arguments for `swh-web iter`.
#[derive(Args, Debug)]
pub struct IterArgs {
    pub swhid: Swhid,
}

/// Arguments for `swh-web exists`.
#[derive(Args, Debug)]
pub struct ExistsArgs {
    pub swhid: Swhid,
}

/// Arguments for `swh-web raw`.
#[derive(Args, Debug)]
pub struct RawArgs {
    /// Content identifier (`swh:1:cnt:...`).
    pub swhid: Swhid,
}

/// Arguments for `swh-web visits`.
#[derive(Args, Debug)]
pub struct VisitsArgs {
    /// Origin URL, e.g. `https://github.com/python/cpython`.
    pub origin: String,
    /// Visits per page.
    #[arg(long, value_name = "N")]
    pub per_page: Option<u32>,
    /// Only list visits older than this visit number.
    #[arg(long, value_name = "N")]
    pub last_visit: Option<u64>,
}

/// Arguments for `swh-web known`.
#[derive(Args, Debug)]
pub struct KnownArgs {
    #[arg(required = true)]
    pub swhids: Vec<Swhid>,
}

pub async fn run_get(args: &GetArgs, client: &WebApiClient) -> Result<u8> {
    if args.raw {
        let raw = client
            .get_raw(args.swhid)
            .await
            .with_context(|| format!("failed to retrieve {}", args.swhid))?;
        print_json(&raw)?;
    } else {
        let obj = client
            .get(args.swhid)
            .await
            .with_context(|| format!("failed to retrieve {}", args.swhid))?;
        print_json(&obj)?;
    }
    Ok(0)
}

/// One JSON line per snapshot page, or a single line for other kinds.
pub async fn run_iter(args: &IterArgs, client: &WebApiClient) -> Result<u8> {
    let mut items = client.iter(args.swhid);
    let mut count = 0usize;
    while let Some(item) = items.next().await {
        let obj = item
            .with_context(|| format!("failed to retrieve {}", args.swhid))?;
        print_json_line(&obj)?;
        count += 1;
    }
    tracing::debug!(swhid = %args.swhid, count, "iteration complete");
    Ok(0)
}

pub async fn run_exists(args: &ExistsArgs, client: &WebApiClient) -> Result<u8> {
    let exists = client
        .exists(args.swhid)
        .await
        .with_context(|| format!("failed to check {}", args.swhid))?;
    println!("{exists}");
    Ok(0)
}

/// Stream the bytes of a content to stdout.
pub async fn run_raw(args: &RawArgs, client: &WebApiClient) -> Result<u8> {
    let mut chunks = client
        .content_raw(args.swhid)
        .await
        .with_context(|| format!("failed to download {}", args.swhid))?;

    let mut stdout = tokio::io::stdout();
    let mut written = 0usize;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk
            .with_context(|| format!("download of {} interrupted", args.swhid))?;
        stdout
            .write_all(&chunk)
            .await
            .context("failed to write to stdout")?;
        written += chunk.len();
    }
    stdout.flush().await.context("failed to flush stdout")?;
    tracing::debug!(swhid = %args.swhid, bytes = written, "content downloaded");
    Ok(0)
}

/// One JSON line per visit, following pagination to the end.
pub async fn run_visits(args: &VisitsArgs, client: &WebApiClient) -> Result<u8> {
    let mut pages = client.visits(&args.origin, args.per_page, args.last_visit);
    while let Some(page) = pages.next_page().await {
        let page = page
            .with_context(|| format!("failed to list visits of {}", args.origin))?;
        for visit in &page {
            print_json_line(visit)?;
        }
    }
    Ok(0)
}

pub async fn run_known(args: &KnownArgs, client: &WebApiClient) -> Result<u8> {
    let answers = client
        .known(&args.swhids)
        .await
        .context("known/ lookup failed")?;
    let rendered: std::collections::BTreeMap<String, bool> = answers
        .into_iter()
        .map(|(swhid, known)| (swhid.to_string(), known))
        .collect();
    print_json(&rendered)?;
    Ok(0)
}
