use std::io::Read;
use std::path::PathBuf;

use flate2::read::GzDecoder;
use warcmirror_fetch::{DownloadTask, HttpClient};

use crate::error::SourceError;
use crate::remote::fetch_bytes;

pub const DEFAULT_CRAWL_HOST: &str = "https://data.commoncrawl.org";

/// Tasks from a web crawl's WARC path manifest.
///
/// The store publishes one gzipped text file per crawl,
/// `crawl-data/{crawl}/warc.paths.gz`, listing every segment path. Each
/// line becomes one range-resumable task; the store publishes no
/// checksums, so completion is judged by the advertised byte count alone.
#[derive(Clone, Debug)]
pub struct CrawlSource {
    host: String,
    crawl: String,
    dest: PathBuf,
}

impl CrawlSource {
    pub fn new(crawl: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            host: DEFAULT_CRAWL_HOST.to_owned(),
            crawl: crawl.into(),
            dest: dest.into(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = trim_trailing_slash(host.into());
        self
    }

    pub fn listing_url(&self) -> String {
        format!("{}/crawl-data/{}/warc.paths.gz", self.host, self.crawl)
    }

    /// Fetch and decode the manifest, returning every segment as a task.
    ///
    /// The manifest is small (one path per line) even for crawls with tens
    /// of thousands of segments, so it is resolved eagerly; only the
    /// downloads themselves are streamed.
    pub async fn tasks<C: HttpClient>(
        &self,
        client: &C,
    ) -> Result<Vec<DownloadTask>, SourceError> {
        let url = self.listing_url();
        tracing::info!(%url, "fetching crawl manifest");
        let compressed = fetch_bytes(client, &url).await?;

        let mut listing = String::new();
        GzDecoder::new(&compressed[..]).read_to_string(&mut listing)?;

        let tasks: Vec<DownloadTask> = listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|path| self.task_for(path))
            .collect();
        tracing::info!(crawl = %self.crawl, segments = tasks.len(), "crawl manifest resolved");
        Ok(tasks)
    }

    fn task_for(&self, path: &str) -> DownloadTask {
        let basename = path.rsplit('/').next().unwrap_or(path);
        DownloadTask::new(
            format!("{}/{}", self.host, path),
            self.dest.join(basename),
        )
        .item(self.crawl.clone())
    }
}

fn trim_trailing_slash(mut s: String) -> String {
    while s.ends_with('/') {
        s.pop();
    }
    s
}
