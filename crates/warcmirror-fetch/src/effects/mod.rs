//! I/O operations: HTTP transport, transfers, retries, the worker pool.

mod http;
mod pool;
mod retry;
mod transfer;

pub use http::{BoxStream, ByteStream, HttpClient, RemoteResponse};
pub use pool::WorkerPool;
pub use retry::with_backoff;
pub use transfer::{download, hash_file};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
