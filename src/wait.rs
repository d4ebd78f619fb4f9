use std::thread;
use std::time::Instant;

use tracing::debug;

use crate::config::WaitConfig;
use crate::error::{PriceError, Result};

/// Calls `check` until it yields `Some`, an error, or the deadline passes.
///
/// The check always runs at least once, so a zero timeout still gets one look.
/// Errors from the check end the wait immediately.
pub fn poll_until<T, F>(what: &str, wait: WaitConfig, mut check: F) -> Result<T>
where
    F: FnMut() -> Result<Option<T>>,
{
    let started = Instant::now();
    let deadline = started + wait.timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = check()? {
            debug!("{} ready after {} attempt(s)", what, attempts);
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PriceError::Timeout {
                what: what.to_string(),
                waited_ms: now.duration_since(started).as_millis(),
            });
        }
        thread::sleep(wait.poll_interval.min(deadline - now));
    }
}
