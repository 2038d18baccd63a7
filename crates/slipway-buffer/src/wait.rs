use std::sync::{Condvar, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Convert a caller timeout into an absolute deadline.
///
/// `None` (and timeouts too large to represent) mean "wait forever".
pub(crate) fn deadline(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}

/// Park on `condvar` until notified or `deadline` passes.
///
/// The second element is `true` when the deadline had already passed on
/// entry; in that case the lock is never released, so the caller's view of
/// the state is unchanged.
pub(crate) fn wait_until<'a, T>(
    condvar: &Condvar,
    guard: MutexGuard<'a, T>,
    deadline: Option<Instant>,
) -> (MutexGuard<'a, T>, bool) {
    match deadline {
        None => (
            condvar.wait(guard).unwrap_or_else(PoisonError::into_inner),
            false,
        ),
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                return (guard, true);
            }
            let (guard, _) = condvar
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            (guard, false)
        }
    }
}
