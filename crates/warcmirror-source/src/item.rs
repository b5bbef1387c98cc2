use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::{Stream, stream};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use warcmirror_fetch::{DownloadTask, HttpClient, RetryPolicy, with_backoff};

use crate::cache::{KvCache, MemCache};
use crate::error::SourceError;
use crate::filter::GlobFilter;
use crate::remote::fetch_bytes;

pub const DEFAULT_ITEM_HOST: &str = "https://archive.org";

/// S3-style API keys for the library's object store, rendered as its
/// `LOW` authorization header. Supplied by the operator; never stored or
/// derived here.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    /// Header to attach to every request of an authenticated session.
    pub fn authorization(&self) -> (String, String) {
        (
            "Authorization".to_owned(),
            format!("LOW {}:{}", self.access_key, self.secret_key),
        )
    }
}

/// One file of an item, as published by the metadata API. Only the fields
/// the downloader needs survive parsing; this is also the cache payload.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RemoteFile {
    pub name: String,

    /// Published MD5, lowercase hex. Older items may lack it.
    #[serde(default)]
    pub md5: Option<String>,
}

#[derive(Deserialize)]
struct ItemMetadata {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

/// Tasks from a digital library's per-item metadata API.
///
/// Each identifier is one item; its file list comes from
/// `{host}/metadata/{identifier}` and is filtered by name before yielding
/// full-body tasks that carry the published MD5. Listings are resolved
/// lazily, one item at a time, as the worker pool drains the stream, and
/// optionally cached across runs.
#[derive(Debug)]
pub struct ItemSource<K = MemCache> {
    host: String,
    dest: PathBuf,
    filter: GlobFilter,
    retry: RetryPolicy,
    cache: Option<K>,
}

impl ItemSource {
    pub fn new(dest: impl Into<PathBuf>, filter: GlobFilter) -> Self {
        Self {
            host: DEFAULT_ITEM_HOST.to_owned(),
            dest: dest.into(),
            filter,
            retry: RetryPolicy::new(5, 4),
            cache: None,
        }
    }
}

impl<K: KvCache> ItemSource<K> {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        let mut host = host.into();
        while host.ends_with('/') {
            host.pop();
        }
        self.host = host;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache<K2: KvCache>(self, cache: K2) -> ItemSource<K2> {
        ItemSource {
            host: self.host,
            dest: self.dest,
            filter: self.filter,
            retry: self.retry,
            cache: Some(cache),
        }
    }

    fn metadata_url(&self, item: &str) -> String {
        format!("{}/metadata/{}", self.host, item)
    }

    /// The item's files matching the name filter, from cache when possible.
    pub async fn files<C: HttpClient>(
        &self,
        client: &C,
        item: &str,
    ) -> Result<Vec<RemoteFile>, SourceError> {
        let key = format!("{item}${}", self.filter.pattern());
        if let Some(bytes) = self.cache.get(&key)? {
            tracing::debug!(item, "listing cache hit");
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let url = self.metadata_url(item);
        let body = with_backoff(self.retry, || fetch_bytes(client, &url)).await?;
        let metadata: ItemMetadata = serde_json::from_slice(&body)?;
        let files: Vec<RemoteFile> = metadata
            .files
            .into_iter()
            .filter(|f| self.filter.is_match(&f.name))
            .collect();
        tracing::debug!(item, files = files.len(), "item listing resolved");

        self.cache.put(&key, &serde_json::to_vec(&files)?)?;
        Ok(files)
    }

    fn task_for(&self, item: &str, file: RemoteFile) -> DownloadTask {
        DownloadTask::new(
            format!("{}/download/{}/{}", self.host, item, file.name),
            self.dest.join(item).join(&file.name),
        )
        .item(item)
        .maybe_checksum(file.md5)
    }

    /// Lazy task stream over `identifiers`: an item's metadata is not
    /// fetched before the consumer reaches its first task. A listing
    /// failure is yielded in place and the stream keeps going with the
    /// next identifier left unpulled, so the consumer decides whether to
    /// stop.
    ///
    /// Owned (`Arc`) handles keep the stream `'static` for spawn-based
    /// consumers like the download worker pool.
    pub fn tasks<C: HttpClient + 'static>(
        self: &Arc<Self>,
        client: &Arc<C>,
        identifiers: Vec<String>,
    ) -> impl Stream<Item = Result<DownloadTask, SourceError>> + Send + 'static
    where
        K: Send + Sync + 'static,
    {
        let source = Arc::clone(self);
        let client = Arc::clone(client);
        let pending = VecDeque::from(identifiers);
        let ready: VecDeque<DownloadTask> = VecDeque::new();
        stream::unfold((pending, ready), move |(mut pending, mut ready)| {
            let source = Arc::clone(&source);
            let client = Arc::clone(&client);
            async move {
                loop {
                    if let Some(task) = ready.pop_front() {
                        return Some((Ok(task), (pending, ready)));
                    }
                    let item = pending.pop_front()?;
                    match source.files(client.as_ref(), &item).await {
                        Ok(files) => {
                            ready.extend(files.into_iter().map(|f| source.task_for(&item, f)));
                        }
                        Err(e) => return Some((Err(e), (pending, ready))),
                    }
                }
            }
        })
    }
}

/// Randomize the visit order, so parallel operator runs over the same set
/// do not all hammer the same items in sequence.
pub fn shuffle_identifiers(identifiers: &mut [String]) {
    identifiers.shuffle(&mut rand::thread_rng());
}
