//! Optional background deadlock detector for the `parking_lot` mutexes and
//! condvars backing the scheduler and its queues.
//!
//! This is a debug-build-only observability aid, not a correctness
//! mechanism: the scheduler's own lock discipline (bounded hold times, no
//! lock held across a blocking wait) is what prevents deadlocks in
//! practice. The detector exists to catch the misuse the design notes warn
//! about — a `wait_for_job` topology that can't make progress — surfacing
//! it as a log line instead of a silent hang during testing. Both the real
//! and no-op bodies are gated on `cfg(debug_assertions)`, so the detector
//! thread never exists in a release build.

use std::thread;
use std::time::Duration;

#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(debug_assertions)]
static DEADLOCK_DETECTOR_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Spawn a background thread that polls `parking_lot::deadlock::check_deadlock`
/// every `interval` and logs any detected cycle at `error!`. A no-op in
/// release builds. At most one detector thread is ever installed per
/// process; a second call (debug or release) returns `None` without
/// spawning another.
#[cfg(debug_assertions)]
pub fn install_deadlock_detector(interval: Duration) -> Option<thread::JoinHandle<()>> {
    if DEADLOCK_DETECTOR_INSTALLED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return None;
    }
    Some(
        thread::Builder::new()
            .name("rt-scheduler-deadlock-detector".to_string())
            .spawn(move || deadlock_detection_loop(interval))
            .expect("failed to spawn deadlock detector thread"),
    )
}

#[cfg(not(debug_assertions))]
pub fn install_deadlock_detector(_interval: Duration) -> Option<thread::JoinHandle<()>> {
    None
}

#[cfg(debug_assertions)]
fn deadlock_detection_loop(interval: Duration) {
    use log::error;
    use parking_lot::deadlock;

    use crate::emit::log_tsv;

    loop {
        thread::sleep(interval);
        let deadlocks = deadlock::check_deadlock();
        if deadlocks.is_empty() {
            continue;
        }
        error!(
            "{}",
            log_tsv(&[
                ("event", "deadlock_detected"),
                ("cycle_count", &deadlocks.len().to_string()),
            ])
        );
        for (i, threads) in deadlocks.iter().enumerate() {
            for thread_deadlock in threads {
                error!(
                    "{}",
                    log_tsv(&[
                        ("event", "deadlock_cycle_thread"),
                        ("cycle", &i.to_string()),
                        ("thread_id", &format!("{:?}", thread_deadlock.thread_id())),
                    ])
                );
            }
        }
    }
}
