//! Command-line front end for the download engine.
//!
//! The audit log goes to stdout as tab-separated rows; everything else
//! (tracing, abort messages) goes to stderr, so
//! `warcmirror crawl ... > audit.tsv` stays clean.

mod cli;
mod report;
mod run;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli::App::parse().run().await {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
