use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::error::HttpError;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Body chunks of one response.
pub type ByteStream = BoxStream<'static, Result<Bytes, HttpError>>;

/// Response to a (possibly ranged) GET with its size already resolved.
pub struct RemoteResponse {
    /// Whole-resource size: the `Content-Range` total when present,
    /// otherwise `Content-Length`. `None` if the server advertised neither.
    pub total: Option<u64>,

    pub body: ByteStream,
}

/// Asynchronous HTTP session abstraction.
///
/// One instance per worker; implementations own their connection state, so
/// no transport state is ever shared between workers.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    /// Issue a GET, optionally resuming with `Range: bytes={offset}-`.
    ///
    /// Non-2xx statuses are errors; 206 Partial Content is a success.
    fn get(
        &self,
        url: &str,
        offset: Option<u64>,
    ) -> impl Future<Output = Result<RemoteResponse, HttpError>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use futures_util::StreamExt;
    use reqwest::header;

    use super::*;
    use crate::core::expected_total;

    /// Production HTTP session backed by `reqwest`. Each instance owns its
    /// own connection pool; default headers carry the store's credentials.
    pub struct ReqwestClient {
        client: reqwest::Client,
        headers: Vec<(String, String)>,
    }

    impl ReqwestClient {
        pub fn new() -> Self {
            Self::with_headers(Vec::new())
        }

        /// A session that attaches the given headers to every request,
        /// e.g. an object store's authorization header.
        pub fn with_headers(headers: Vec<(String, String)>) -> Self {
            Self {
                client: reqwest::Client::new(),
                headers,
            }
        }
    }

    impl Default for ReqwestClient {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HttpClient for ReqwestClient {
        async fn get(&self, url: &str, offset: Option<u64>) -> Result<RemoteResponse, HttpError> {
            let mut request = self.client.get(url);
            for (key, value) in &self.headers {
                request = request.header(key, value);
            }
            if let Some(offset) = offset {
                request = request.header(header::RANGE, format!("bytes={offset}-"));
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(HttpError::Status {
                    code: status.as_u16(),
                });
            }

            let content_range = response
                .headers()
                .get(header::CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let content_length = response
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            let total = expected_total(content_range.as_deref(), content_length);

            let body = response.bytes_stream().map(|r| r.map_err(HttpError::from));
            Ok(RemoteResponse {
                total,
                body: Box::pin(body),
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
