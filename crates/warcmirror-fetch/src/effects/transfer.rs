//! Single-file transfer: resumable byte-range downloads and verified
//! full-body downloads, both finalized by an atomic rename.

use std::io::SeekFrom;
use std::path::Path;
use std::time::Instant;

use futures_util::StreamExt;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use warcmirror_verify::{Hasher, Md5Hasher};

use crate::data::{DownloadOutcome, DownloadTask, TransferMode, TransferOptions};
use crate::error::{FetchError, Transient};
use crate::effects::http::HttpClient;
use crate::effects::retry::with_backoff;
use crate::core::{hidden_temp_path, worker_temp_path};

const READ_BUF_SIZE: usize = 64 * 1024;

/// Download one task to its destination, converting every error into a
/// `Failed` outcome. This is the worker boundary: nothing escapes.
pub async fn download<C: HttpClient>(
    client: &C,
    task: &DownloadTask,
    worker: usize,
    opts: &TransferOptions,
) -> DownloadOutcome {
    let started = Instant::now();
    match run(client, task, worker, opts, started).await {
        Ok(outcome) => outcome,
        Err(failure) => DownloadOutcome::Failed {
            path: task.dest.clone(),
            size: failure.size,
            elapsed: started.elapsed(),
            error: failure.error,
        },
    }
}

/// Compute a file's MD5 by reading it once, sequentially.
pub async fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Md5Hasher::new();
    rehash_existing(&mut file, &mut hasher).await?;
    Ok(hasher.finalize_hex())
}

/// A task failure plus the advertised size, when the headers got that far.
struct TransferFailure {
    size: Option<u64>,
    error: FetchError,
}

impl From<FetchError> for TransferFailure {
    fn from(error: FetchError) -> Self {
        Self { size: None, error }
    }
}

async fn run<C: HttpClient>(
    client: &C,
    task: &DownloadTask,
    worker: usize,
    opts: &TransferOptions,
    started: Instant,
) -> Result<DownloadOutcome, TransferFailure> {
    if let Some(parent) = task.dest.parent() {
        fs::create_dir_all(parent).await.map_err(FetchError::from)?;
    }

    if fs::try_exists(&task.dest).await.map_err(FetchError::from)? {
        match (opts.verify_existing, &task.checksum) {
            (true, Some(expected)) => {
                let actual = hash_file(&task.dest).await.map_err(FetchError::from)?;
                if actual.eq_ignore_ascii_case(expected) {
                    return Ok(DownloadOutcome::AlreadyPresent {
                        path: task.dest.clone(),
                    });
                }
                tracing::warn!(
                    path = %task.dest.display(),
                    %actual,
                    %expected,
                    "existing file fails verification, downloading again"
                );
                fs::remove_file(&task.dest).await.map_err(FetchError::from)?;
            }
            _ => {
                return Ok(DownloadOutcome::AlreadyPresent {
                    path: task.dest.clone(),
                });
            }
        }
    }

    match opts.mode {
        TransferMode::Resumable => resumable(client, task, opts, started).await,
        TransferMode::FullBody => full_body(client, task, worker, opts, started).await,
    }
}

/// Resumable transfer: append to a shared hidden temp file, issuing a range
/// request from its current length on every attempt. On failure the temp
/// file is deliberately left behind for a future session.
async fn resumable<C: HttpClient>(
    client: &C,
    task: &DownloadTask,
    opts: &TransferOptions,
    started: Instant,
) -> Result<DownloadOutcome, TransferFailure> {
    let temp = hidden_temp_path(&task.dest);
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(&temp)
        .await
        .map_err(FetchError::from)?;

    // Restart the digest over whatever a previous session left behind; the
    // temp file's length is an exact count of confirmed bytes.
    let mut hasher = Md5Hasher::new();
    let mut written = rehash_existing(&mut file, &mut hasher)
        .await
        .map_err(FetchError::from)?;
    if written > 0 {
        tracing::debug!(path = %task.dest.display(), offset = written, "resuming");
    }

    let mut size = None;
    let mut attempt = 0;
    while attempt < opts.max_attempts {
        attempt += 1;
        match attempt_once(client, &task.url, &mut file, &mut hasher, &mut written).await {
            Ok(expected) => {
                size = Some(expected);
                if written < expected {
                    tracing::debug!(
                        path = %task.dest.display(),
                        written,
                        expected,
                        attempt,
                        "response ended early"
                    );
                    continue;
                }
                if written > expected {
                    // The size contract was violated; more retries would
                    // only paper over corruption.
                    return Err(TransferFailure {
                        size,
                        error: FetchError::Overrun { written, expected },
                    });
                }
                file.flush().await.map_err(FetchError::from)?;
                drop(file);
                fs::rename(&temp, &task.dest).await.map_err(FetchError::from)?;
                return Ok(DownloadOutcome::Completed {
                    path: task.dest.clone(),
                    size: expected,
                    elapsed: started.elapsed(),
                    checksum: hasher.finalize_hex(),
                });
            }
            Err(e)
                if attempt < opts.max_attempts
                    && (e.is_transient() || matches!(e, FetchError::MissingContentSize)) =>
            {
                let delay = opts.retry.delay(attempt);
                tracing::warn!(attempt, "waiting {}s because: {e}", delay.as_secs());
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(TransferFailure { size, error }),
        }
    }

    Err(TransferFailure {
        size,
        error: FetchError::ExhaustedRetries {
            attempts: opts.max_attempts,
        },
    })
}

/// One range request: resolve the advertised total, then append the body to
/// the temp file while feeding the running digest.
async fn attempt_once<C: HttpClient, H: Hasher>(
    client: &C,
    url: &str,
    file: &mut File,
    hasher: &mut H,
    written: &mut u64,
) -> Result<u64, FetchError> {
    let response = client.get(url, Some(*written)).await?;
    let expected = response.total.ok_or(FetchError::MissingContentSize)?;

    let mut body = response.body;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        *written += chunk.len() as u64;
    }
    Ok(expected)
}

/// Full-body transfer: one GET streamed into a worker-unique temp file and
/// checked against the a-priori checksum. The temp file never survives an
/// error here; without range requests there is nothing to resume.
async fn full_body<C: HttpClient>(
    client: &C,
    task: &DownloadTask,
    worker: usize,
    opts: &TransferOptions,
    started: Instant,
) -> Result<DownloadOutcome, TransferFailure> {
    let temp = worker_temp_path(&task.dest, worker);

    let fetched = with_backoff(opts.retry, || fetch_full(client, &task.url, &temp)).await;
    let (size, checksum) = match fetched {
        Ok(ok) => ok,
        Err(error) => {
            remove_if_exists(&temp).await;
            return Err(TransferFailure { size: None, error });
        }
    };

    if let Some(expected) = &task.checksum
        && !checksum.eq_ignore_ascii_case(expected)
    {
        remove_if_exists(&temp).await;
        return Err(TransferFailure {
            size: Some(size),
            error: FetchError::ChecksumMismatch {
                expected: expected.clone(),
                actual: checksum,
            },
        });
    }

    if let Err(e) = fs::rename(&temp, &task.dest).await {
        remove_if_exists(&temp).await;
        return Err(TransferFailure {
            size: Some(size),
            error: e.into(),
        });
    }

    Ok(DownloadOutcome::Completed {
        path: task.dest.clone(),
        size,
        elapsed: started.elapsed(),
        checksum,
    })
}

/// One whole-body GET into `temp` (truncating any earlier attempt), hashing
/// while streaming. Returns the byte count and digest.
async fn fetch_full<C: HttpClient>(
    client: &C,
    url: &str,
    temp: &Path,
) -> Result<(u64, String), FetchError> {
    let response = client.get(url, None).await?;
    let mut file = File::create(temp).await?;
    let mut hasher = Md5Hasher::new();
    let mut size = 0u64;

    let mut body = response.body;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        size += chunk.len() as u64;
    }
    file.flush().await?;
    Ok((size, hasher.finalize_hex()))
}

/// Feed a file's bytes into `hasher` from the start, returning its length.
/// Leaves the cursor at end-of-file.
async fn rehash_existing<H: Hasher>(file: &mut File, hasher: &mut H) -> std::io::Result<u64> {
    file.seek(SeekFrom::Start(0)).await?;
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut len = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        len += n as u64;
    }
    Ok(len)
}

async fn remove_if_exists(path: &Path) {
    if let Err(e) = fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), "failed to remove temp file: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use bytes::Bytes;
    use futures_util::stream;
    use tempfile::TempDir;

    use super::*;
    use crate::data::RetryPolicy;
    use crate::effects::http::RemoteResponse;
    use crate::error::HttpError;

    enum Scripted {
        Body {
            total: Option<u64>,
            chunks: Vec<Result<Bytes, HttpError>>,
        },
        Fail(HttpError),
    }

    /// Mock session that replays scripted responses and records the range
    /// offset of every request.
    struct MockClient {
        responses: Mutex<VecDeque<Scripted>>,
        offsets: Mutex<Vec<Option<u64>>>,
    }

    impl MockClient {
        fn new(responses: Vec<Scripted>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                offsets: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<Option<u64>> {
            self.offsets.lock().unwrap().clone()
        }
    }

    impl HttpClient for MockClient {
        async fn get(&self, _url: &str, offset: Option<u64>) -> Result<RemoteResponse, HttpError> {
            self.offsets.lock().unwrap().push(offset);
            match self.responses.lock().unwrap().pop_front() {
                Some(Scripted::Body { total, chunks }) => Ok(RemoteResponse {
                    total,
                    body: Box::pin(stream::iter(chunks)),
                }),
                Some(Scripted::Fail(e)) => Err(e),
                None => Err(HttpError::Other("no scripted response left".into())),
            }
        }
    }

    fn body(total: Option<u64>, data: &[u8]) -> Scripted {
        Scripted::Body {
            total,
            chunks: vec![Ok(Bytes::copy_from_slice(data))],
        }
    }

    fn resumable_opts(max_attempts: u32) -> TransferOptions {
        TransferOptions {
            mode: TransferMode::Resumable,
            max_attempts,
            retry: RetryPolicy::new(3, 2),
            ..TransferOptions::default()
        }
    }

    fn full_body_opts() -> TransferOptions {
        TransferOptions {
            mode: TransferMode::FullBody,
            ..TransferOptions::default()
        }
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_existing_destination_short_circuits_without_network() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");
        fs::write(&dest, b"already here").await.unwrap();

        let client = MockClient::new(vec![]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest);
        let outcome = download(&client, &task, 0, &resumable_opts(10)).await;

        assert!(matches!(outcome, DownloadOutcome::AlreadyPresent { .. }));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_resume_requests_range_from_temp_length() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");
        let data = payload(1000);

        // A previous session already confirmed the first 400 bytes.
        fs::write(hidden_temp_path(&dest), &data[..400])
            .await
            .unwrap();

        let client = MockClient::new(vec![body(Some(1000), &data[400..])]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest);
        let outcome = download(&client, &task, 0, &resumable_opts(10)).await;

        match outcome {
            DownloadOutcome::Completed { size, checksum, .. } => {
                assert_eq!(size, 1000);
                assert_eq!(checksum, Md5Hasher::digest_hex(&data));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(client.requests(), vec![Some(400)]);
        assert_eq!(fs::read(&dest).await.unwrap(), data);
        assert!(!fs::try_exists(hidden_temp_path(&dest)).await.unwrap());
    }

    #[tokio::test]
    async fn test_truncating_server_fails_after_exact_attempt_budget() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");

        // Every response advertises 1000 bytes but sends none.
        let responses = (0..4).map(|_| body(Some(1000), b"")).collect();
        let client = MockClient::new(responses);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest);
        let outcome = download(&client, &task, 0, &resumable_opts(4)).await;

        match outcome {
            DownloadOutcome::Failed { size, error, .. } => {
                assert_eq!(size, Some(1000));
                assert!(matches!(error, FetchError::ExhaustedRetries { attempts: 4 }));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        // Exactly 4 attempts, not 3 or 5.
        assert_eq!(client.requests().len(), 4);
        // The temp file stays behind for a future session.
        assert!(fs::try_exists(hidden_temp_path(&dest)).await.unwrap());
        assert!(!fs::try_exists(&dest).await.unwrap());
    }

    #[tokio::test]
    async fn test_resumable_collects_across_truncated_responses() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");
        let data = payload(300);

        let client = MockClient::new(vec![
            body(Some(300), &data[..100]),
            body(Some(300), &data[100..250]),
            body(Some(300), &data[250..]),
        ]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest);
        let outcome = download(&client, &task, 0, &resumable_opts(10)).await;

        match outcome {
            DownloadOutcome::Completed { size, checksum, .. } => {
                assert_eq!(size, 300);
                assert_eq!(checksum, Md5Hasher::digest_hex(&data));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        // Each follow-up resumed exactly where the last response ended.
        assert_eq!(client.requests(), vec![Some(0), Some(100), Some(250)]);
    }

    #[tokio::test]
    async fn test_overrun_is_fatal_and_not_retried() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");

        let client = MockClient::new(vec![body(Some(100), &payload(150))]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest);
        let outcome = download(&client, &task, 0, &resumable_opts(10)).await;

        match outcome {
            DownloadOutcome::Failed { error, .. } => {
                assert!(matches!(
                    error,
                    FetchError::Overrun {
                        written: 150,
                        expected: 100
                    }
                ));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_size_consumes_attempts() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");

        let client = MockClient::new(vec![body(None, b""), body(None, b"")]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest);
        let outcome = download(&client, &task, 0, &resumable_opts(2)).await;

        match outcome {
            DownloadOutcome::Failed { size, error, .. } => {
                assert_eq!(size, None);
                assert!(matches!(error, FetchError::MissingContentSize));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_mid_body_resumes_from_new_offset() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");
        let data = payload(200);

        let client = MockClient::new(vec![
            Scripted::Body {
                total: Some(200),
                chunks: vec![
                    Ok(Bytes::copy_from_slice(&data[..80])),
                    Err(HttpError::Connect("reset by peer".into())),
                ],
            },
            body(Some(200), &data[80..]),
        ]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest);
        let outcome = download(&client, &task, 0, &resumable_opts(10)).await;

        match outcome {
            DownloadOutcome::Completed { size, checksum, .. } => {
                assert_eq!(size, 200);
                assert_eq!(checksum, Md5Hasher::digest_hex(&data));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        // The 80 bytes written before the reset were not re-requested.
        assert_eq!(client.requests(), vec![Some(0), Some(80)]);
    }

    #[tokio::test]
    async fn test_full_body_checksum_mismatch_deletes_temp() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");

        let client = MockClient::new(vec![body(None, b"not what was promised")]);
        let task =
            DownloadTask::new("http://host/file.warc.gz", &dest).checksum("abc123");
        let outcome = download(&client, &task, 3, &full_body_opts()).await;

        match outcome {
            DownloadOutcome::Failed { error, .. } => match error {
                FetchError::ChecksumMismatch { expected, actual } => {
                    assert_eq!(expected, "abc123");
                    assert_eq!(
                        actual,
                        Md5Hasher::digest_hex(b"not what was promised")
                    );
                }
                other => panic!("expected ChecksumMismatch, got {other:?}"),
            },
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(!fs::try_exists(&dest).await.unwrap());
        assert!(!fs::try_exists(worker_temp_path(&dest, 3)).await.unwrap());
    }

    #[tokio::test]
    async fn test_full_body_success_renames_into_place() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("sub").join("file.warc.gz");
        let data = payload(64);

        let client = MockClient::new(vec![body(None, &data)]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest)
            .checksum(Md5Hasher::digest_hex(&data));
        let outcome = download(&client, &task, 1, &full_body_opts()).await;

        match outcome {
            DownloadOutcome::Completed { size, checksum, .. } => {
                assert_eq!(size, 64);
                assert_eq!(checksum, Md5Hasher::digest_hex(&data));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(fs::read(&dest).await.unwrap(), data);
        assert!(!fs::try_exists(worker_temp_path(&dest, 1)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_body_retries_transient_then_succeeds() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");
        let data = payload(32);

        let client = MockClient::new(vec![
            Scripted::Fail(HttpError::Connect("refused".into())),
            body(None, &data),
        ]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest)
            .checksum(Md5Hasher::digest_hex(&data));
        let outcome = download(&client, &task, 0, &full_body_opts()).await;

        assert!(matches!(outcome, DownloadOutcome::Completed { .. }));
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_full_body_http_error_deletes_temp() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");

        let client = MockClient::new(vec![Scripted::Fail(HttpError::Status { code: 403 })]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest).checksum("00");
        let outcome = download(&client, &task, 0, &full_body_opts()).await;

        match outcome {
            DownloadOutcome::Failed { error, .. } => {
                assert!(matches!(
                    error,
                    FetchError::Http(HttpError::Status { code: 403 })
                ));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(!fs::try_exists(worker_temp_path(&dest, 0)).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_existing_redownloads_on_mismatch() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");
        let data = payload(48);
        fs::write(&dest, b"stale corrupted content").await.unwrap();

        let client = MockClient::new(vec![body(None, &data)]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest)
            .checksum(Md5Hasher::digest_hex(&data));
        let opts = TransferOptions {
            verify_existing: true,
            ..full_body_opts()
        };
        let outcome = download(&client, &task, 0, &opts).await;

        assert!(matches!(outcome, DownloadOutcome::Completed { .. }));
        assert_eq!(fs::read(&dest).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_verify_existing_accepts_matching_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.warc.gz");
        let data = payload(48);
        fs::write(&dest, &data).await.unwrap();

        let client = MockClient::new(vec![]);
        let task = DownloadTask::new("http://host/file.warc.gz", &dest)
            .checksum(Md5Hasher::digest_hex(&data));
        let opts = TransferOptions {
            verify_existing: true,
            ..full_body_opts()
        };
        let outcome = download(&client, &task, 0, &opts).await;

        assert!(matches!(outcome, DownloadOutcome::AlreadyPresent { .. }));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_hash_file_matches_oneshot_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob");
        let data = payload(100_000);
        fs::write(&path, &data).await.unwrap();

        assert_eq!(hash_file(&path).await.unwrap(), Md5Hasher::digest_hex(&data));
    }
}
