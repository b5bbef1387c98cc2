use crate::data::DownloadOutcome;
use crate::error::BreakerTripped;

/// Trip after this many consecutive failures by default (the trip happens
/// on the failure *after* the threshold, i.e. the 101st).
pub const DEFAULT_TRIP_THRESHOLD: u32 = 100;

/// Consecutive-failure counter over the result stream, owned by the pool's
/// caller. Any success resets it; sustained failures mean the remote is
/// probably down globally and continuing would only burn bandwidth.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    consecutive: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive: 0,
        }
    }

    /// Feed one outcome. Returns `Err` when consecutive failures strictly
    /// exceed the threshold.
    pub fn observe(&mut self, outcome: &DownloadOutcome) -> Result<(), BreakerTripped> {
        if outcome.is_failed() {
            self.consecutive += 1;
            if self.consecutive > self.threshold {
                return Err(BreakerTripped {
                    consecutive: self.consecutive,
                    threshold: self.threshold,
                });
            }
        } else {
            self.consecutive = 0;
        }
        Ok(())
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_TRIP_THRESHOLD)
    }
}
