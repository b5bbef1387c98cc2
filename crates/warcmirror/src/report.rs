//! Tab-separated audit log, one row per terminal outcome.

use std::io;

use warcmirror_fetch::{DownloadOutcome, TaskResult};

/// Writes `timestamp item name path size time md5 error` rows, no header.
/// `AlreadyPresent` outcomes are not logged; a re-run over a finished tree
/// produces an empty log.
pub struct AuditSink<W: io::Write> {
    writer: csv::Writer<W>,
}

impl AuditSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: io::Write> AuditSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(writer),
        }
    }

    pub fn record(&mut self, result: &TaskResult) -> anyhow::Result<()> {
        let timestamp = chrono::Local::now().to_rfc3339();
        let row: [String; 8] = match &result.outcome {
            DownloadOutcome::Completed {
                path,
                size,
                elapsed,
                checksum,
            } => [
                timestamp,
                result.item.clone(),
                result.name.clone(),
                path.display().to_string(),
                size.to_string(),
                format!("{:.3}", elapsed.as_secs_f64()),
                checksum.clone(),
                String::new(),
            ],
            DownloadOutcome::AlreadyPresent { .. } => return Ok(()),
            DownloadOutcome::Failed {
                path,
                size,
                elapsed,
                error,
            } => [
                timestamp,
                result.item.clone(),
                result.name.clone(),
                path.display().to_string(),
                size.map(|s| s.to_string()).unwrap_or_default(),
                format!("{:.3}", elapsed.as_secs_f64()),
                String::new(),
                error.to_string(),
            ],
        };
        self.writer.write_record(&row)?;
        // An operator tails this log; rows must not sit in a buffer.
        self.writer.flush()?;
        Ok(())
    }
}
