use futures_util::StreamExt;
use warcmirror_fetch::{HttpClient, HttpError};

/// Fetch a small resource (a listing, not an archive file) fully into
/// memory.
pub(crate) async fn fetch_bytes<C: HttpClient>(
    client: &C,
    url: &str,
) -> Result<Vec<u8>, HttpError> {
    let response = client.get(url, None).await?;
    let mut body = response.body;
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf)
}
