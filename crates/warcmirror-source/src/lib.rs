//! Task sources for the download engine: where the files to mirror come
//! from.
//!
//! Two stores are supported:
//! - [`CrawlSource`] lists a web-crawl's WARC segment paths from a single
//!   gzipped manifest and yields range-resumable tasks without checksums.
//! - [`ItemSource`] lists a digital-library item's files from its metadata
//!   API and yields full-body tasks carrying the published MD5. Listings go
//!   through a pluggable [`KvCache`] so re-runs over large item sets skip
//!   the metadata round-trips.
//!
//! Both produce [`DownloadTask`](warcmirror_fetch::DownloadTask)s for the
//! engine's worker pool and stay transport-agnostic behind its
//! [`HttpClient`](warcmirror_fetch::HttpClient) seam.

mod cache;
mod crawl;
mod error;
mod filter;
mod item;
mod remote;

pub use cache::{FsCache, KvCache, MemCache};
pub use crawl::{CrawlSource, DEFAULT_CRAWL_HOST};
pub use error::SourceError;
pub use filter::GlobFilter;
pub use item::{Credentials, DEFAULT_ITEM_HOST, ItemSource, RemoteFile, shuffle_identifiers};
