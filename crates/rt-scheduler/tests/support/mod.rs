//! Shared test doubles for the scheduler's end-to-end and property tests.
//!
//! This is explicitly test-only scaffolding, not part of the library's
//! public surface — a host integration would write its own adapter the
//! same way a language binding's argument-marshaling layer would.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rt_scheduler::callback::JobBody;
use rt_scheduler::{Context, JobCallType, JobId, QueueId, Scheduler, SchedulerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Execute(JobId),
    Cleanup(JobId),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events_of(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

/// A body that records an `Execute`/`Cleanup` event each time it is
/// invoked and returns a fixed result code.
pub fn recording_body(log: EventLog, result_code: i32) -> JobBody {
    Box::new(move |mode, job_id, _ctx| {
        let event = match mode {
            JobCallType::Execute => Event::Execute(job_id),
            JobCallType::Cleanup => Event::Cleanup(job_id),
        };
        log.lock().unwrap().push(event);
        result_code
    })
}

/// Like [`recording_body`], but also runs `spawn` once during `EXECUTE`,
/// with the body's own job id and context — for scenarios where a job
/// creates and submits further jobs as part of running (fan-out parents).
pub fn spawning_body<F>(log: EventLog, result_code: i32, spawn: F) -> JobBody
where
    F: Fn(JobId, &Context) + Send + 'static,
{
    Box::new(move |mode, job_id, ctx| {
        match mode {
            JobCallType::Execute => {
                log.lock().unwrap().push(Event::Execute(job_id));
                spawn(job_id, ctx);
            }
            JobCallType::Cleanup => {
                log.lock().unwrap().push(Event::Cleanup(job_id));
            }
        }
        result_code
    })
}

pub const DEFAULT_QUEUE: QueueId = QueueId(0);

pub fn new_scheduler(capacity: u32) -> Arc<Scheduler> {
    Scheduler::new(SchedulerConfig::new(capacity).with_name("test-scheduler"))
        .expect("valid test scheduler configuration")
}

pub fn new_scheduler_with_waiters_max(capacity: u32, waiters_max: usize) -> Arc<Scheduler> {
    Scheduler::new(
        SchedulerConfig::new(capacity)
            .with_waiters_max(waiters_max)
            .with_name("test-scheduler"),
    )
    .expect("valid test scheduler configuration")
}

pub fn new_context(scheduler: &Arc<Scheduler>) -> Context {
    scheduler.create_context(DEFAULT_QUEUE, std::thread::current().id())
}
