//! Fixed-size worker pool pulling tasks lazily from a shared stream.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::data::{DownloadOutcome, DownloadTask, PoolOptions, TaskResult, TransferOptions};
use crate::error::{FetchError, PoolError};
use crate::effects::http::HttpClient;
use crate::effects::transfer::download;

/// Runs tasks from a fallible stream across `workers` concurrent workers
/// and yields [`TaskResult`]s in completion order.
///
/// Tasks are pulled one at a time as workers free up, so a source backed by
/// paginated listings is only consumed as fast as downloads finish. Each
/// worker owns its own HTTP session; nothing transport-level is shared.
///
/// A source error halts dispatch (in-flight downloads still drain) and is
/// surfaced by [`join`](WorkerPool::join).
pub struct WorkerPool<E: std::error::Error> {
    results: mpsc::Receiver<TaskResult>,
    halted: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    source_error: Arc<StdMutex<Option<E>>>,
}

impl<E: std::error::Error + Send + 'static> WorkerPool<E> {
    /// Spawn the pool. `sessions` builds one HTTP session per worker index.
    pub fn spawn<C, S, F>(mut sessions: F, tasks: S, opts: PoolOptions) -> Self
    where
        C: HttpClient + 'static,
        S: Stream<Item = Result<DownloadTask, E>> + Send + Unpin + 'static,
        F: FnMut(usize) -> C,
    {
        let count = opts.workers.max(1);
        let (tx, rx) = mpsc::channel(count);
        let shared = Shared {
            tasks: Arc::new(Mutex::new(tasks)),
            claimed: Arc::new(StdMutex::new(HashSet::new())),
            halted: Arc::new(AtomicBool::new(false)),
            source_error: Arc::new(StdMutex::new(None)),
            transfer: Arc::new(opts.transfer),
        };

        let workers = (0..count)
            .map(|id| {
                let client = sessions(id);
                tokio::spawn(worker_loop(id, client, shared.clone(), tx.clone()))
            })
            .collect();

        Self {
            results: rx,
            halted: shared.halted,
            workers,
            source_error: shared.source_error,
        }
    }

    /// Next result in completion order; `None` once every worker is done.
    pub async fn next(&mut self) -> Option<TaskResult> {
        self.results.recv().await
    }

    /// Stop dispatching new tasks. Downloads already in flight run to their
    /// outcome and still appear on the result stream.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
    }

    /// Wait for every worker to exit, then report run-level failures.
    pub async fn join(mut self) -> Result<(), PoolError<E>> {
        // Unblocks workers parked on a full result channel.
        self.results.close();
        for worker in self.workers.drain(..) {
            worker.await?;
        }
        let source_error = self
            .source_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match source_error {
            Some(e) => Err(PoolError::Source(e)),
            None => Ok(()),
        }
    }
}

/// State shared by every worker of one pool.
struct Shared<S, E> {
    tasks: Arc<Mutex<S>>,
    /// Destinations claimed in this run; a second claim is rejected before
    /// any bytes move, since two workers appending to one temp file would
    /// silently interleave.
    claimed: Arc<StdMutex<HashSet<PathBuf>>>,
    halted: Arc<AtomicBool>,
    source_error: Arc<StdMutex<Option<E>>>,
    transfer: Arc<TransferOptions>,
}

impl<S, E> Clone for Shared<S, E> {
    fn clone(&self) -> Self {
        Self {
            tasks: self.tasks.clone(),
            claimed: self.claimed.clone(),
            halted: self.halted.clone(),
            source_error: self.source_error.clone(),
            transfer: self.transfer.clone(),
        }
    }
}

async fn worker_loop<C, S, E>(
    id: usize,
    client: C,
    shared: Shared<S, E>,
    results: mpsc::Sender<TaskResult>,
) where
    C: HttpClient,
    S: Stream<Item = Result<DownloadTask, E>> + Unpin,
{
    loop {
        // The stream lock doubles as the dispatch point: exactly one worker
        // pulls the next task, and only when it has capacity for it. The
        // halt flag must be re-read under the lock: a worker parked here
        // while halt() flips would otherwise dispatch one more task.
        let next = {
            let mut tasks = shared.tasks.lock().await;
            if shared.halted.load(Ordering::SeqCst) {
                return;
            }
            tasks.next().await
        };
        // halt() may also land while this worker is pulling (the stream can
        // do its own I/O); a task pulled after that is dropped undispatched.
        if shared.halted.load(Ordering::SeqCst) {
            return;
        }
        let task = match next {
            Some(Ok(task)) => task,
            Some(Err(e)) => {
                let mut slot = shared
                    .source_error
                    .lock()
                    .unwrap_or_else(|e| e.into_inner());
                if slot.is_none() {
                    *slot = Some(e);
                }
                shared.halted.store(true, Ordering::SeqCst);
                return;
            }
            None => return,
        };

        let fresh = shared
            .claimed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(task.dest.clone());
        let outcome = if fresh {
            download(&client, &task, id, &shared.transfer).await
        } else {
            DownloadOutcome::Failed {
                path: task.dest.clone(),
                size: None,
                elapsed: Duration::ZERO,
                error: FetchError::DuplicateDestination(task.dest.clone()),
            }
        };

        let result = TaskResult {
            item: task.item,
            name: task.name,
            outcome,
        };
        if results.send(result).await.is_err() {
            // Receiver gone; nobody is listening for outcomes any more.
            return;
        }
    }
}
