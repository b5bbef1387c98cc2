use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use warcmirror_fetch::{
    CircuitBreaker, PoolOptions, ReqwestClient, RetryPolicy, TransferMode, TransferOptions,
    WorkerPool,
};
use warcmirror_source::{
    Credentials, DEFAULT_ITEM_HOST, FsCache, GlobFilter, ItemSource, shuffle_identifiers,
};

use crate::report::AuditSink;
use crate::run::{RunStatus, drive};

/// Mirror selected files of library items. File lists come from the
/// metadata API (optionally cached); downloads are single authenticated
/// GETs verified against the published MD5.
#[derive(Debug, clap::Args)]
pub struct Item {
    /// Item identifiers; read from stdin, one per line, when omitted
    pub identifiers: Vec<String>,

    /// Base URL of the library
    #[arg(long, default_value = DEFAULT_ITEM_HOST)]
    pub host: String,

    /// Directory the items land in (one subdirectory per item)
    #[arg(long, default_value = ".")]
    pub dest: PathBuf,

    /// Glob selecting which of an item's files to fetch
    #[arg(long, default_value = "*.warc.gz")]
    pub filter: String,

    /// Visit items in random order
    #[arg(long)]
    pub shuffle: bool,

    /// Directory for the listing cache; re-runs skip metadata lookups
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Re-hash files already on disk and re-download on mismatch
    #[arg(long)]
    pub check_md5: bool,

    /// Concurrent downloads (1 = fully serial)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// API access key; falls back to IA_ACCESS_KEY
    #[arg(long)]
    pub access_key: Option<String>,

    /// API secret key; falls back to IA_SECRET_KEY
    #[arg(long)]
    pub secret_key: Option<String>,
}

impl Item {
    pub async fn run(self) -> anyhow::Result<RunStatus> {
        let mut identifiers = if self.identifiers.is_empty() {
            read_identifiers(std::io::stdin().lock())?
        } else {
            self.identifiers.clone()
        };
        if self.shuffle {
            shuffle_identifiers(&mut identifiers);
        }
        tracing::info!(items = identifiers.len(), "starting item run");

        let cache = match &self.cache {
            Some(dir) => Some(FsCache::open(dir).context("opening listing cache")?),
            None => None,
        };
        let filter = GlobFilter::new(&self.filter).context("parsing --filter")?;
        let source = Arc::new(
            ItemSource::new(&self.dest, filter)
                .host(&self.host)
                .retry(RetryPolicy::new(5, 4))
                .cache(cache),
        );

        let headers = match self.credentials() {
            Some(creds) => vec![creds.authorization()],
            None => Vec::new(),
        };
        let listing_client = Arc::new(ReqwestClient::with_headers(headers.clone()));
        let tasks = Box::pin(source.tasks(&listing_client, identifiers));

        let mut options = PoolOptions::default();
        if let Some(jobs) = self.jobs {
            options.workers = jobs;
        }
        options.transfer = TransferOptions {
            mode: TransferMode::FullBody,
            verify_existing: self.check_md5,
            retry: RetryPolicy::new(3, 2),
            ..TransferOptions::default()
        };

        let pool = WorkerPool::spawn(
            move |_| ReqwestClient::with_headers(headers.clone()),
            tasks,
            options,
        );
        drive(pool, AuditSink::stdout(), CircuitBreaker::default()).await
    }

    fn credentials(&self) -> Option<Credentials> {
        let access_key = self
            .access_key
            .clone()
            .or_else(|| std::env::var("IA_ACCESS_KEY").ok())?;
        let secret_key = self
            .secret_key
            .clone()
            .or_else(|| std::env::var("IA_SECRET_KEY").ok())?;
        Some(Credentials {
            access_key,
            secret_key,
        })
    }
}

fn read_identifiers(input: impl BufRead) -> anyhow::Result<Vec<String>> {
    let mut identifiers = Vec::new();
    for line in input.lines() {
        let line = line.context("reading identifiers from stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            identifiers.push(line.to_owned());
        }
    }
    Ok(identifiers)
}
