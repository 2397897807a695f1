//! Timeout helpers and default durations.

use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Default per-read deadline for a session
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// How long shutdown waits for active sessions to finish
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `future`, mapping deadline expiry to [`ProtocolError::Timeout`].
pub async fn with_timeout_error<F, T>(future: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}
