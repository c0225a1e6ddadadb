use std::time::Duration;

use tracing::info;

use crate::constants::REQUEST_LOG_TARGET;
use crate::REQUEST_DURATION_MS;

/// Outcome of a logged render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Ok,
    Failed,
}

impl RequestStatus {
    /// HTTP-like status code used in the request log
    pub fn code(self) -> &'static str {
        match self {
            RequestStatus::Ok => "200",
            RequestStatus::Failed => "500",
        }
    }
}

/// Fire-and-forget request record.
///
/// Emitted on the `request_log` target and observed in the request duration histogram.
pub fn log_request(
    key: &str,
    status: RequestStatus,
    size: Option<usize>,
    duration: Duration,
) {
    let duration_ms = duration.as_secs_f64() * 1000.0;
    REQUEST_DURATION_MS
        .with_label_values(&[status.code()])
        .observe(duration_ms);
    info!(
        target: REQUEST_LOG_TARGET,
        key,
        status = status.code(),
        size,
        method = "API",
        duration_ms,
        "render request"
    );
}
