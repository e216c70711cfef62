//! Small retry combinator used by the provider pool, the chunked log
//! reader, and every price strategy. Replaces the nested try/except ladders
//! of the source system with a single reusable shape (see DESIGN.md).

use std::time::Duration;

use tracing::warn;

/// Bounded exponential-ish backoff schedule used throughout the crate:
/// roughly 1s, 2s, 3s, 5s, 8s.
pub const BACKOFF_SCHEDULE_SECS: [u64; 5] = [1, 2, 3, 5, 8];

pub fn backoff_delay(attempt: usize) -> Duration {
    let idx = attempt.min(BACKOFF_SCHEDULE_SECS.len() - 1);
    Duration::from_secs(BACKOFF_SCHEDULE_SECS[idx])
}

/// Classifies an error as transient (worth retrying / rotating provider) or
/// terminal (propagate immediately).
pub enum Transience {
    Transient,
    Terminal,
}

/// Runs `op` up to `attempts` times, sleeping on the schedule in
/// [`BACKOFF_SCHEDULE_SECS`] between attempts. `classify` decides whether a
/// given error is worth retrying; `on_retry` is invoked between attempts
/// (e.g. to rotate the provider pool) before the backoff sleep.
pub async fn retry<T, E, F, Fut, C, R>(
    mut op: F,
    attempts: usize,
    mut classify: C,
    mut on_retry: R,
) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    C: FnMut(&E) -> Transience,
    R: FnMut(usize, &E),
{
    let mut last_err = None;
    for attempt in 0..attempts.max(1) {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let transience = classify(&e);
                on_retry(attempt, &e);
                if matches!(transience, Transience::Terminal) {
                    return Err(e);
                }
                if attempt + 1 < attempts {
                    let delay = backoff_delay(attempt);
                    warn!(attempt, delay_secs = delay.as_secs(), "retrying after transient error");
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.expect("attempts >= 1 guarantees at least one error"))
}
