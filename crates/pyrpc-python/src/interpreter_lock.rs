//! Process-wide exclusive lock around every entry into the interpreter
//!
//! The GIL alone does not serialize bridge calls: user code that sleeps or
//! does I/O releases it mid-call. Every bridge operation therefore holds a
//! process-wide mutex for its whole duration, on top of the GIL.
//!
//! Lock ordering: the mutex is only ever waited on with the GIL released
//! (`Python::detach`), so a thread holding the GIL never blocks on the mutex
//! and the mutex holder can always reacquire the GIL.

use crate::errors::BridgeError;
use parking_lot::Mutex;
use pyo3::prelude::*;
use pyrpc_logger as logger;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static INTERPRETER_LOCK: Mutex<()> = parking_lot::const_mutex(());

static ACQUISITIONS: AtomicU64 = AtomicU64::new(0);
static SLOW_ACQUISITIONS: AtomicU64 = AtomicU64::new(0);
static TOTAL_WAIT_US: AtomicU64 = AtomicU64::new(0);
static MAX_WAIT_US: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static HELD_BY_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Snapshot of interpreter lock contention since process start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockStats {
    pub acquisitions: u64,
    /// Acquisitions that waited longer than the configured threshold
    pub slow_acquisitions: u64,
    pub total_wait: Duration,
    pub max_wait: Duration,
}

impl LockStats {
    pub fn mean_wait(&self) -> Duration {
        if self.acquisitions == 0 {
            return Duration::ZERO;
        }
        self.total_wait / u32::try_from(self.acquisitions).unwrap_or(u32::MAX)
    }
}

pub fn stats() -> LockStats {
    LockStats {
        acquisitions: ACQUISITIONS.load(Ordering::Relaxed),
        slow_acquisitions: SLOW_ACQUISITIONS.load(Ordering::Relaxed),
        total_wait: Duration::from_micros(TOTAL_WAIT_US.load(Ordering::Relaxed)),
        max_wait: Duration::from_micros(MAX_WAIT_US.load(Ordering::Relaxed)),
    }
}

/// Whether the calling thread is currently inside a bridge operation
pub fn is_held_by_current_thread() -> bool {
    HELD_BY_THREAD.with(Cell::get)
}

/// Clears the per-thread flag on every exit path, unwinding included
struct HeldFlag;

impl HeldFlag {
    fn set() -> Self {
        HELD_BY_THREAD.with(|held| held.set(true));
        HeldFlag
    }
}

impl Drop for HeldFlag {
    fn drop(&mut self) {
        HELD_BY_THREAD.with(|held| held.set(false));
    }
}

/// Run `f` with the GIL and the interpreter lock held.
///
/// Both are released before this returns, whether `f` succeeds, fails or
/// panics. `op` names the operation in log output.
pub(crate) fn with_interpreter<R>(
    op: &str,
    slow_threshold: Duration,
    f: impl FnOnce(Python<'_>) -> Result<R, BridgeError>,
) -> Result<R, BridgeError> {
    if is_held_by_current_thread() {
        return Err(BridgeError::Reentrant);
    }

    let start = Instant::now();
    Python::attach(|py| {
        let _guard = py.detach(|| INTERPRETER_LOCK.lock());
        let _held = HeldFlag::set();
        record_wait(op, start.elapsed(), slow_threshold);
        f(py)
    })
}

fn record_wait(op: &str, waited: Duration, slow_threshold: Duration) {
    let waited_us = u64::try_from(waited.as_micros()).unwrap_or(u64::MAX);
    ACQUISITIONS.fetch_add(1, Ordering::Relaxed);
    TOTAL_WAIT_US.fetch_add(waited_us, Ordering::Relaxed);
    MAX_WAIT_US.fetch_max(waited_us, Ordering::Relaxed);

    if waited > slow_threshold {
        SLOW_ACQUISITIONS.fetch_add(1, Ordering::Relaxed);
        logger::warn(&format!(
            "{}: waited {} us for the interpreter lock (threshold {} ms)",
            op,
            waited_us,
            slow_threshold.as_millis()
        ));
    } else {
        logger::step(&format!(
            "{}: took {} us to acquire the interpreter lock",
            op, waited_us
        ));
    }
}
