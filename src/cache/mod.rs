//! Cache-aside resolution.
//!
//! [`resolve`] reads the cache, falls back to the authoritative source on a
//! miss and writes a found value back. A failed write-back never fails the
//! lookup: the value is still returned and the failure is logged.

use std::fmt::Display;
use std::future::Future;

/// Resolves a value through `read`, then `fetch`, writing fetched values via `write`.
///
/// `fetch` only runs on a cache miss, and `write` only runs when `fetch`
/// found something; it receives its own copy of the value.
///
/// # Errors
///
/// Propagates errors from `read` and `fetch`. Errors from `write` are logged
/// and swallowed.
pub async fn resolve<T: Clone, E, W, R, RF, F, FF, WR, WF>(
    read: R,
    fetch: F,
    write: WR,
) -> Result<Option<T>, E>
where
    R: FnOnce() -> RF,
    RF: Future<Output = Result<Option<T>, E>>,
    F: FnOnce() -> FF,
    FF: Future<Output = Result<Option<T>, E>>,
    WR: FnOnce(T) -> WF,
    WF: Future<Output = Result<(), W>>,
    W: Display,
{
    if let Some(cached) = read().await? {
        tracing::debug!("cache hit");
        return Ok(Some(cached));
    }

    let Some(value) = fetch().await? else {
        tracing::debug!("cache miss, source has no value");
        return Ok(None);
    };

    if let Err(e) = write(value.clone()).await {
        tracing::warn!(error = %e, "cache write-back failed");
    }
    Ok(Some(value))
}
