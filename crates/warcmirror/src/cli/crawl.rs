use std::path::PathBuf;

use futures_util::stream;
use warcmirror_fetch::{
    CircuitBreaker, PoolOptions, ReqwestClient, RetryPolicy, TransferMode, TransferOptions,
    WorkerPool,
};
use warcmirror_source::{CrawlSource, DEFAULT_CRAWL_HOST, SourceError};

use crate::report::AuditSink;
use crate::run::{RunStatus, drive};

/// Mirror every WARC segment listed in a crawl's path manifest. Segments
/// are fetched with byte-range resumption; a re-run picks interrupted
/// files up where they stopped.
#[derive(Debug, clap::Args)]
pub struct Crawl {
    /// Crawl identifier, e.g. CC-MAIN-2024-10
    pub crawl: String,

    /// Base URL of the crawl data store
    #[arg(long, default_value = DEFAULT_CRAWL_HOST)]
    pub host: String,

    /// Directory the segments land in
    #[arg(long, default_value = ".")]
    pub dest: PathBuf,

    /// Concurrent downloads (1 = fully serial)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Attempts per segment before giving up
    #[arg(long, default_value_t = TransferOptions::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

impl Crawl {
    pub async fn run(self) -> anyhow::Result<RunStatus> {
        let source = CrawlSource::new(&self.crawl, &self.dest).host(&self.host);
        let tasks = source.tasks(&ReqwestClient::new()).await?;
        let tasks = stream::iter(tasks.into_iter().map(Ok::<_, SourceError>));

        let mut options = PoolOptions::default();
        if let Some(jobs) = self.jobs {
            options.workers = jobs;
        }
        options.transfer = TransferOptions {
            mode: TransferMode::Resumable,
            max_attempts: self.max_attempts,
            verify_existing: false,
            retry: RetryPolicy::new(self.max_attempts, 2),
        };

        let pool = WorkerPool::spawn(|_| ReqwestClient::new(), tasks, options);
        drive(pool, AuditSink::stdout(), CircuitBreaker::default()).await
    }
}
