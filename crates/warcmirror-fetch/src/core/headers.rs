/// Parse the whole-resource total out of a `Content-Range` header value.
///
/// Accepts `bytes 400-999/1000` style values; an unknown total (`/*`)
/// yields `None`.
pub fn content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    let total = total.trim();
    if total == "*" {
        return None;
    }
    total.parse().ok()
}

/// Whole content length of a normal or a range response.
///
/// The total from `Content-Range` wins; `Content-Length` is the fallback.
/// `None` means the server advertised no size at all, which fails the
/// current attempt.
pub fn expected_total(content_range: Option<&str>, content_length: Option<u64>) -> Option<u64> {
    content_range.and_then(content_range_total).or(content_length)
}
