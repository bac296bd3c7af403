//! Demonstrates the worker-loop contract a host builds on top of
//! `Context::run_next_job`: run until signaled, and if the loop's own body
//! (not a job body — those panics are already caught at the scheduler's
//! invocation site) traps an unrecoverable error, record `exit_code` /
//! `exit_message` and unregister the context rather than taking the whole
//! process down. One worker's fault must not stop the others.

mod support;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use rt_scheduler::{RunOutcome, Scheduler};

use support::{new_context, new_log, new_scheduler, DEFAULT_QUEUE};

struct WorkerExit {
    exit_code: i32,
    exit_message: Option<String>,
}

/// The pattern a host implements around its worker thread's top-level loop:
/// catch anything the loop itself raises (not job bodies, which the
/// scheduler already isolates), unregister the context on the way out, and
/// report what happened instead of propagating the panic to the thread.
fn run_worker(scheduler: &Arc<Scheduler>, mut step: impl FnMut(&rt_scheduler::Context) -> RunOutcome) -> WorkerExit {
    let ctx = new_context(scheduler);
    let result = catch_unwind(AssertUnwindSafe(|| loop {
        match step(&ctx) {
            RunOutcome::Ran(_) => continue,
            RunOutcome::Signaled => break,
        }
    }));
    scheduler.release_context(&ctx);
    match result {
        Ok(()) => WorkerExit {
            exit_code: 0,
            exit_message: None,
        },
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker loop panicked with a non-string payload".to_string());
            WorkerExit {
                exit_code: -1,
                exit_message: Some(message),
            }
        }
    }
}

#[test]
fn clean_shutdown_reports_success_and_releases_context() {
    let scheduler = new_scheduler(8);
    let queue = scheduler.create_queue(DEFAULT_QUEUE);
    // Signal before the worker ever blocks, so run_next_job returns
    // Signaled on its first call instead of waiting for work that never
    // arrives.
    queue.signal(rt_scheduler::JobQueueSignal::Terminate);

    let exit = run_worker(&scheduler, |ctx| ctx.run_next_job());

    assert_eq!(exit.exit_code, 0);
    assert!(exit.exit_message.is_none());
    assert_eq!(scheduler.worker_count_for_queue(DEFAULT_QUEUE), 0);
}

#[test]
fn unrecoverable_loop_error_is_reported_without_taking_down_other_workers() {
    let scheduler = new_scheduler(8);
    scheduler.create_queue(DEFAULT_QUEUE);
    let log = new_log();

    // Worker A's own loop body is broken (simulating a host-side bug, not a
    // job body failure); worker B runs normally on the same scheduler.
    let scheduler_a = Arc::clone(&scheduler);
    let exit_a = run_worker(&scheduler_a, |_ctx| panic!("simulated unrecoverable worker fault"));
    assert_eq!(exit_a.exit_code, -1);
    assert_eq!(
        exit_a.exit_message.as_deref(),
        Some("simulated unrecoverable worker fault")
    );
    assert_eq!(
        scheduler.worker_count_for_queue(DEFAULT_QUEUE),
        0,
        "worker A's context is unregistered even after an unrecoverable error"
    );

    let ctx_b = new_context(&scheduler);
    let job = ctx_b
        .create_job(Some(support::recording_body(Arc::clone(&log), 0)), rt_scheduler::JobId::NONE)
        .unwrap();
    ctx_b.submit_job(job, rt_scheduler::JobSubmitType::Run, None, &[]);
    assert!(matches!(ctx_b.run_next_job(), RunOutcome::Ran(_)));
    assert!(scheduler.job_state(job).is_none());
    scheduler.release_context(&ctx_b);
}
