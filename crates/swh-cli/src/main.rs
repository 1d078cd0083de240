//! # swh-web CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use swh_cli::archive::{
    run_exists, run_get, run_iter, run_known, run_raw, run_visits, ExistsArgs, GetArgs, IterArgs,
    KnownArgs, RawArgs, VisitsArgs,
};
use swh_cli::auth::{run_auth, AuthArgs};
use swh_cli::ConnectionArgs;

/// Software Heritage archive client
///
/// Retrieves archived source code objects by persistent identifier (SWHID)
/// and prints them as JSON.
#[derive(Parser, Debug)]
#[command(name = "swh-web", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Retrieve an object and print it as JSON.
    Get(GetArgs),

    /// Retrieve an object lazily: one JSON line per snapshot page.
    Iter(IterArgs),

    /// Print whether the archive holds an object.
    Exists(ExistsArgs),

    /// Write the bytes of a content to stdout.
    Raw(RawArgs),

    /// List the visits of a software origin.
    Visits(VisitsArgs),

    /// Ask which identifiers the archive holds.
    Known(KnownArgs),

    /// Obtain, refresh, and revoke API tokens.
    Auth(AuthArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // stdout carries the JSON output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("swh-web CLI v{} starting", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let conn = &cli.connection;
    match &cli.command {
        Commands::Get(args) => run_get(args, &conn.connect().await?).await,
        Commands::Iter(args) => run_iter(args, &conn.connect().await?).await,
        Commands::Exists(args) => run_exists(args, &conn.connect().await?).await,
        Commands::Raw(args) => run_raw(args, &conn.connect().await?).await,
        Commands::Visits(args) => run_visits(args, &conn.connect().await?).await,
        Commands::Known(args) => run_known(args, &conn.connect().await?).await,
        Commands::Auth(args) => run_auth(args, &conn.oidc_session()?).await,
    }
}
