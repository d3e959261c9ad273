use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use crate::{Error, Result};

/// Millisecond clock anchored at connection start.
///
/// RTMP timestamps are 32-bit and relative to an arbitrary epoch agreed on
/// during the handshake; they wrap after roughly 49.7 days.
#[derive(Debug, Clone, Copy)]
pub struct Epoch {
    started: Instant,
}

impl Epoch {
    pub fn now() -> Self {
        Epoch { started: Instant::now() }
    }

    /// Milliseconds since the epoch, wrapping at 2^32
    pub fn elapsed_ms(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Epoch::now()
    }
}

/// Run `fut` under `limit`, mapping expiry to `Error::Timeout`
pub async fn with_timeout<T, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(format!("{} timed out after {:?}", what, limit))),
    }
}
