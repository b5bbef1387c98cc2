//! The run loop: consume pool results, feed the audit log and the circuit
//! breaker, and fold everything into a process exit status.

use std::io;

use anyhow::Context;
use warcmirror_fetch::{CircuitBreaker, WorkerPool};

use crate::report::AuditSink;

/// What a whole run amounted to, after every outcome was accounted for.
#[derive(Debug, Default)]
pub struct RunStatus {
    pub completed: u64,
    pub already_present: u64,
    pub failed: u64,
    pub tripped: bool,
}

impl RunStatus {
    /// `0` = clean; `1` = at least one file failed; `2` = the breaker
    /// aborted the run.
    pub fn code(&self) -> u8 {
        if self.tripped {
            2
        } else if self.failed > 0 {
            1
        } else {
            0
        }
    }
}

/// Drain the pool to completion. A breaker trip halts dispatch but keeps
/// consuming, so in-flight downloads still land in the audit log.
pub async fn drive<E, W>(
    mut pool: WorkerPool<E>,
    mut sink: AuditSink<W>,
    mut breaker: CircuitBreaker,
) -> anyhow::Result<RunStatus>
where
    E: std::error::Error + Send + Sync + 'static,
    W: io::Write,
{
    let mut status = RunStatus::default();
    while let Some(result) = pool.next().await {
        use warcmirror_fetch::DownloadOutcome::*;
        match &result.outcome {
            Completed { .. } => status.completed += 1,
            AlreadyPresent { .. } => status.already_present += 1,
            Failed { error, .. } => {
                status.failed += 1;
                tracing::warn!(item = %result.item, name = %result.name, "download failed: {error}");
            }
        }
        sink.record(&result)?;

        if !status.tripped
            && let Err(trip) = breaker.observe(&result.outcome)
        {
            tracing::error!("{trip}");
            status.tripped = true;
            pool.halt();
        }
    }
    pool.join().await.context("run aborted")?;

    tracing::info!(
        completed = status.completed,
        already_present = status.already_present,
        failed = status.failed,
        "run finished"
    );
    Ok(status)
}
