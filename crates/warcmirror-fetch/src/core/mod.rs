//! Pure transformations, free of I/O.

mod breaker;
mod headers;
mod retry;
mod temp;

pub use breaker::{CircuitBreaker, DEFAULT_TRIP_THRESHOLD};
pub use headers::{content_range_total, expected_total};
pub use retry::retry_delay;
pub use temp::{hidden_temp_path, worker_temp_path};
