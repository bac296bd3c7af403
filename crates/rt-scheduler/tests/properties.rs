//! Deterministic property tests for P1-P3 and P6-P8.
//!
//! Ordering claims (P2, P3, P8) are checked against a logical clock — an
//! `AtomicU64` bumped once per recorded event — rather than wall-clock
//! timestamps, so the assertions never flake under scheduling jitter.

mod support;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rt_scheduler::{JobCallType, JobId, JobQueueSignal, JobSubmitResult, JobSubmitType};

use support::{new_context, new_scheduler, new_scheduler_with_waiters_max, DEFAULT_QUEUE};

struct Clock(AtomicU64);

impl Clock {
    fn new() -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(0)))
    }

    fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

#[test]
fn p1_every_submitted_job_reaches_a_terminal_state() {
    let scheduler = new_scheduler(8);
    let ctx = new_context(&scheduler);

    let job = ctx.create_job(None, JobId::NONE).unwrap();
    assert_eq!(
        ctx.submit_job(job, JobSubmitType::Run, None, &[]),
        JobSubmitResult::Success
    );

    assert!(matches!(ctx.run_next_job(), rt_scheduler::RunOutcome::Ran(_)));
    assert!(scheduler.job_state(job).is_none(), "job slot reclaimed after completion");
}

#[test]
fn p2_dependency_execute_happens_after_dependency_complete() {
    let scheduler = new_scheduler(8);
    let ctx = new_context(&scheduler);
    let clock = Clock::new();

    let complete_b_at = Arc::new(AtomicU64::new(u64::MAX));
    let begin_execute_a_at = Arc::new(AtomicU64::new(u64::MAX));

    let clock_b = Arc::clone(&clock);
    let complete_b_at_body = Arc::clone(&complete_b_at);
    let body_b = Box::new(move |mode: JobCallType, _id: JobId, _ctx: &rt_scheduler::Context| {
        if mode == JobCallType::Execute {
            complete_b_at_body.store(clock_b.tick(), Ordering::SeqCst);
        }
        0
    });

    let clock_a = Arc::clone(&clock);
    let begin_execute_a_at_body = Arc::clone(&begin_execute_a_at);
    let body_a = Box::new(move |mode: JobCallType, _id: JobId, _ctx: &rt_scheduler::Context| {
        if mode == JobCallType::Execute {
            begin_execute_a_at_body.store(clock_a.tick(), Ordering::SeqCst);
        }
        0
    });

    let b = ctx.create_job(Some(body_b), JobId::NONE).unwrap();
    let a = ctx.create_job(Some(body_a), JobId::NONE).unwrap();

    assert_eq!(ctx.submit_job(b, JobSubmitType::Run, None, &[]), JobSubmitResult::Success);
    assert_eq!(
        ctx.submit_job(a, JobSubmitType::Run, None, &[b]),
        JobSubmitResult::Success
    );

    // Drain until both have run; order is determined by the dependency,
    // not by submission or queue position.
    for _ in 0..2 {
        assert!(matches!(ctx.run_next_job(), rt_scheduler::RunOutcome::Ran(_)));
    }

    let b_tick = complete_b_at.load(Ordering::SeqCst);
    let a_tick = begin_execute_a_at.load(Ordering::SeqCst);
    assert!(b_tick < a_tick, "B's execute ({b_tick}) must precede A's execute ({a_tick})");
}

#[test]
fn p3_parent_completes_after_every_child() {
    let scheduler = new_scheduler(8);
    let ctx = new_context(&scheduler);
    let clock = Clock::new();

    let child_complete_ticks = Arc::new(std::sync::Mutex::new(Vec::new()));
    let parent_complete_tick = Arc::new(AtomicU64::new(u64::MAX));

    // The parent's own body finishes (and ticks the clock during CLEANUP)
    // well before its children do, but the parent must not actually reach
    // COMPLETED until every child has (I3): completion is deferred while
    // outstanding_children > 0.
    let clock_p = Arc::clone(&clock);
    let parent_tick = Arc::clone(&parent_complete_tick);
    let parent = ctx
        .create_job(
            Some(Box::new(move |mode: JobCallType, _id: JobId, _ctx: &rt_scheduler::Context| {
                if mode == JobCallType::Cleanup {
                    parent_tick.store(clock_p.tick(), Ordering::SeqCst);
                }
                0
            })),
            JobId::NONE,
        )
        .unwrap();

    let mut children = Vec::new();
    for _ in 0..3 {
        let clock_c = Arc::clone(&clock);
        let ticks = Arc::clone(&child_complete_ticks);
        let body = Box::new(move |mode: JobCallType, _id: JobId, _ctx: &rt_scheduler::Context| {
            if mode == JobCallType::Cleanup {
                ticks.lock().unwrap().push(clock_c.tick());
            }
            0
        });
        let child = ctx.create_job(Some(body), parent).unwrap();
        assert_eq!(
            ctx.submit_job(child, JobSubmitType::Run, None, &[]),
            JobSubmitResult::Success
        );
        children.push(child);
    }
    assert_eq!(
        ctx.submit_job(parent, JobSubmitType::Run, None, &[]),
        JobSubmitResult::Success
    );

    // Run parent + 3 children to completion.
    for _ in 0..4 {
        assert!(matches!(ctx.run_next_job(), rt_scheduler::RunOutcome::Ran(_)));
    }

    let max_child_tick = *child_complete_ticks.lock().unwrap().iter().max().unwrap();
    let parent_tick = parent_complete_tick.load(Ordering::SeqCst);
    assert!(
        max_child_tick < parent_tick,
        "every child ({max_child_tick}) must complete before the parent ({parent_tick})"
    );
}

#[test]
fn p6_signal_quiescence_after_terminate() {
    let scheduler = new_scheduler(4);
    let queue = scheduler.create_queue(DEFAULT_QUEUE);
    let ctx = new_context(&scheduler);

    let job = ctx.create_job(None, JobId::NONE).unwrap();
    ctx.submit_job(job, JobSubmitType::Run, None, &[]);

    scheduler.terminate();

    assert_eq!(queue.peek_signal(), JobQueueSignal::Terminate);
    match queue.dequeue_or_wait() {
        rt_scheduler::Dequeued::Signaled(JobQueueSignal::Terminate) => {}
        other => panic!("expected Signaled(Terminate), got {other:?}"),
    }
}

#[test]
fn p7_bounded_waiters_cancels_the_overflowing_dependent() {
    let waiters_max = 4;
    let scheduler = new_scheduler_with_waiters_max(16, waiters_max);
    let ctx = new_context(&scheduler);

    let dependency = ctx.create_job(None, JobId::NONE).unwrap();
    // Do not submit `dependency` yet, so it stays non-terminal and
    // accumulates waiters.

    for _ in 0..waiters_max {
        let dependent = ctx.create_job(None, JobId::NONE).unwrap();
        assert_eq!(
            ctx.submit_job(dependent, JobSubmitType::Run, None, &[dependency]),
            JobSubmitResult::Success
        );
    }

    let overflowing = ctx.create_job(None, JobId::NONE).unwrap();
    assert_eq!(
        ctx.submit_job(overflowing, JobSubmitType::Run, None, &[dependency]),
        JobSubmitResult::TooManyWaiters
    );
    assert_eq!(scheduler.job_state(overflowing), None, "canceled job's slot is reclaimed");
}

#[test]
fn p8_waiters_become_ready_in_insertion_order() {
    let scheduler = new_scheduler(16);
    let ctx = new_context(&scheduler);

    let dependency = ctx.create_job(None, JobId::NONE).unwrap();

    let log = support::new_log();
    let mut submitted_order = Vec::new();
    for _ in 0..5 {
        let body = support::recording_body(Arc::clone(&log), 0);
        let dependent = ctx.create_job(Some(body), JobId::NONE).unwrap();
        assert_eq!(
            ctx.submit_job(dependent, JobSubmitType::Run, None, &[dependency]),
            JobSubmitResult::Success
        );
        submitted_order.push(dependent);
    }

    assert_eq!(
        ctx.submit_job(dependency, JobSubmitType::Run, None, &[]),
        JobSubmitResult::Success
    );
    // Running the dependency first, then draining the now-ready dependents
    // in order, since they all share the default queue (FIFO).
    assert!(matches!(ctx.run_next_job(), rt_scheduler::RunOutcome::Ran(_)));
    for _ in 0..5 {
        assert!(matches!(ctx.run_next_job(), rt_scheduler::RunOutcome::Ran(_)));
    }

    let executed_order: Vec<JobId> = support::events_of(&log)
        .into_iter()
        .filter_map(|e| match e {
            support::Event::Execute(id) => Some(id),
            support::Event::Cleanup(_) => None,
        })
        .collect();
    assert_eq!(executed_order, submitted_order);
}
