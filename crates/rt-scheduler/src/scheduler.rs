//! Owns the job pool, the queue table, and the context table; implements
//! the submit/complete/cancel algorithms that drive the dependency and
//! parent/child graph.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info};
use parking_lot::Mutex;

use crate::callback::JobBody;
use crate::context::Context;
use crate::emit::log_tsv;
use crate::error::SchedulerError;
use crate::job::{JobCallType, JobId, JobQueueSignal, JobRecord, JobState, JobSubmitResult, JobSubmitType};
use crate::pool::JobPool;
use crate::queue::{QueueId, WaitQueue};

/// Host OS thread identifier. We reuse `std::thread::ThreadId` rather than
/// a raw integer: it is exactly "the host OS thread id" the design calls
/// for, already unforgeable, and avoids a host accidentally registering a
/// collision.
pub type ThreadId = std::thread::ThreadId;

/// Construction parameters for a [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Job pool capacity. Must be a power of two (validated by [`JobPool`]).
    pub job_capacity: u32,
    /// Maximum waiters a single job may accumulate before a dependent
    /// submit fails with `TooManyWaiters`. Spec suggests 16-32; default 32.
    pub waiters_max: usize,
    /// Expected number of contexts, used only to presize the context
    /// table; contexts may still be created beyond this count.
    pub initial_context_capacity: u32,
    /// Debug-only name, used in log lines.
    pub name: Option<String>,
}

impl SchedulerConfig {
    pub fn new(job_capacity: u32) -> Self {
        Self {
            job_capacity,
            waiters_max: 32,
            initial_context_capacity: 1,
            name: None,
        }
    }

    pub fn with_waiters_max(mut self, waiters_max: usize) -> Self {
        self.waiters_max = waiters_max;
        self
    }

    pub fn with_initial_context_capacity(mut self, initial_context_capacity: u32) -> Self {
        self.initial_context_capacity = initial_context_capacity;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

struct ContextRecord {
    thread_id: ThreadId,
    default_queue: QueueId,
}

struct SchedulerInner {
    pool: JobPool,
    queues: HashMap<QueueId, Arc<WaitQueue>>,
    contexts: HashMap<u64, ContextRecord>,
}

/// Owns every queue, context, and job record; the single lock guarding pool
/// and graph mutations lives here. Queues carry their own mutex/condvar, so
/// blocking on a queue never holds the scheduler lock.
pub struct Scheduler {
    inner: Mutex<SchedulerInner>,
    waiters_max: usize,
    name: Option<String>,
    next_context_id: AtomicU64,
}

struct CompletionOutcome {
    to_wake: Vec<(Arc<WaitQueue>, JobId)>,
    body: Option<JobBody>,
    parent_to_rollup: Option<JobId>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Arc<Self>, SchedulerError> {
        let pool = JobPool::new(config.job_capacity)?;
        info!(
            "{}",
            log_tsv(&[
                ("event", "scheduler_create"),
                ("name", config.name.as_deref().unwrap_or("-")),
                ("job_capacity", &config.job_capacity.to_string()),
                ("waiters_max", &config.waiters_max.to_string()),
                ("initial_context_capacity", &config.initial_context_capacity.to_string()),
            ])
        );
        Ok(Arc::new(Self {
            inner: Mutex::new(SchedulerInner {
                pool,
                queues: HashMap::new(),
                contexts: HashMap::with_capacity(config.initial_context_capacity as usize),
            }),
            waiters_max: config.waiters_max,
            name: config.name,
            next_context_id: AtomicU64::new(1),
        }))
    }

    /// Look up or lazily create the queue identified by `queue_id`.
    pub fn create_queue(&self, queue_id: QueueId) -> Arc<WaitQueue> {
        let mut inner = self.inner.lock();
        Arc::clone(
            inner
                .queues
                .entry(queue_id)
                .or_insert_with(|| Arc::new(WaitQueue::new())),
        )
    }

    pub(crate) fn queue_for(&self, queue_id: QueueId) -> Option<Arc<WaitQueue>> {
        self.inner.lock().queues.get(&queue_id).cloned()
    }

    /// Register a new thread-affine [`Context`] whose default queue is
    /// `default_queue` (created if it doesn't exist yet).
    pub fn create_context(self: &Arc<Self>, default_queue: QueueId, thread_id: ThreadId) -> Context {
        let context_id = self.next_context_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut inner = self.inner.lock();
            inner
                .queues
                .entry(default_queue)
                .or_insert_with(|| Arc::new(WaitQueue::new()));
            inner.contexts.insert(
                context_id,
                ContextRecord {
                    thread_id,
                    default_queue,
                },
            );
        }
        debug!(
            "{}",
            log_tsv(&[
                ("event", "context_create"),
                ("context_id", &context_id.to_string()),
                ("queue", &default_queue.0.to_string()),
            ])
        );
        Context::new(Arc::clone(self), context_id, default_queue, thread_id)
    }

    pub fn release_context(&self, context: &Context) {
        let mut inner = self.inner.lock();
        inner.contexts.remove(&context.context_id());
    }

    /// Count of contexts whose default queue currently equals `queue_id`.
    /// This is a snapshot at call time, not a stable running count — a
    /// context's default queue cannot change after creation in this
    /// implementation, so the only thing that moves this number is
    /// contexts being created or released.
    pub fn worker_count_for_queue(&self, queue_id: QueueId) -> usize {
        let inner = self.inner.lock();
        inner
            .contexts
            .values()
            .filter(|c| c.default_queue == queue_id)
            .count()
    }

    /// Signal every known queue with `TERMINATE`.
    pub fn terminate(&self) {
        let inner = self.inner.lock();
        for queue in inner.queues.values() {
            queue.signal(JobQueueSignal::Terminate);
        }
        info!(
            "{}",
            log_tsv(&[
                ("event", "scheduler_terminate"),
                ("name", self.name.as_deref().unwrap_or("-")),
            ])
        );
    }

    /// `terminate()` plus a best-effort join of host-owned worker threads,
    /// bounded by an optional timeout. Strictly additive: a host that
    /// prefers to join its own threads can ignore this and call
    /// `terminate()` directly.
    pub fn terminate_and_join(
        &self,
        handles: Vec<std::thread::JoinHandle<()>>,
        timeout: Option<Duration>,
    ) {
        self.terminate();
        let deadline = timeout.map(|t| Instant::now() + t);
        for handle in handles {
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    break;
                }
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        error!(
                            "{}",
                            log_tsv(&[("event", "worker_join_timeout")])
                        );
                        break;
                    }
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }

    pub fn job_state(&self, job_id: JobId) -> Option<JobState> {
        self.inner.lock().pool.get(job_id).map(|r| r.state)
    }

    pub(crate) fn create_job(
        &self,
        parent: JobId,
        target_queue: QueueId,
        body: Option<JobBody>,
    ) -> Result<JobId, SchedulerError> {
        let mut inner = self.inner.lock();
        if !parent.is_none() {
            let parent_ok = inner
                .pool
                .get(parent)
                .map(|p| !p.state.is_terminal())
                .unwrap_or(false);
            if !parent_ok {
                return Err(SchedulerError::InvalidParent);
            }
        }
        let record = JobRecord::new(parent, target_queue, body);
        let job_id = inner
            .pool
            .try_allocate(record)
            .ok_or(SchedulerError::PoolExhausted)?;

        if !parent.is_none() {
            let prev_head = inner.pool.get_mut(parent).map(|p| {
                let previous = p.first_child;
                p.first_child = Some(job_id.index());
                previous
            });
            if let Some(previous) = prev_head {
                if let Some(new_job) = inner.pool.get_mut(job_id) {
                    new_job.next_sibling = previous;
                }
            }
        }
        Ok(job_id)
    }

    pub(crate) fn submit_job(
        &self,
        context: &Context,
        job_id: JobId,
        submit_type: JobSubmitType,
        target_queue: Option<QueueId>,
        dependencies: &[JobId],
    ) -> JobSubmitResult {
        let mut inner = self.inner.lock();
        let current_state = match inner.pool.get(job_id) {
            Some(record) => record.state,
            None => return JobSubmitResult::InvalidJob,
        };
        if current_state != JobState::NotSubmitted {
            return JobSubmitResult::InvalidJob;
        }

        let already_flagged = inner
            .pool
            .get(job_id)
            .map(|r| r.cancel_flag)
            .unwrap_or(false);
        if submit_type == JobSubmitType::Cancel || already_flagged {
            // Either an explicit CANCEL submit, or a job that inherited
            // cancel_flag from an ancestor's cancellation (I6) — either way
            // it still goes through the normal completion path rather than
            // being rejected, so CLEANUP still runs exactly once (G1). Only
            // the flag is set here; `finalize_locked` performs the actual
            // terminal-state transition once outstanding_children is
            // confirmed to be 0 (I3) — this job may itself already have
            // children submitted under it while still NOT_SUBMITTED.
            if let Some(record) = inner.pool.get_mut(job_id) {
                record.cancel_flag = true;
            }
            drop(inner);
            self.run_completion(job_id, context);
            return JobSubmitResult::Success;
        }

        let queue_id = target_queue.unwrap_or_else(|| context.default_queue());
        if let Some(record) = inner.pool.get_mut(job_id) {
            record.target_queue = queue_id;
        }

        for &dep_id in dependencies {
            let dep_terminal = inner
                .pool
                .get(dep_id)
                .map(|d| d.state.is_terminal())
                .unwrap_or(true);
            if dep_terminal {
                continue;
            }
            let is_full = inner
                .pool
                .get(dep_id)
                .map(|d| d.waiters.len() >= self.waiters_max)
                .unwrap_or(false);
            if is_full {
                // Flag only; see the CANCEL branch above for why the state
                // transition itself is left to `finalize_locked`.
                if let Some(record) = inner.pool.get_mut(job_id) {
                    record.cancel_flag = true;
                }
                drop(inner);
                self.run_completion(job_id, context);
                return JobSubmitResult::TooManyWaiters;
            }
            if let Some(dep) = inner.pool.get_mut(dep_id) {
                dep.waiters.push(job_id);
            }
            if let Some(record) = inner.pool.get_mut(job_id) {
                record.predecessors_remaining += 1;
            }
        }

        let parent = inner.pool.get(job_id).map(|r| r.parent).unwrap_or(JobId::NONE);
        if !parent.is_none() {
            let parent_terminal = inner
                .pool
                .get(parent)
                .map(|p| p.state.is_terminal())
                .unwrap_or(true);
            if parent_terminal {
                // Same flag-only discipline as the two branches above.
                if let Some(record) = inner.pool.get_mut(job_id) {
                    record.cancel_flag = true;
                }
                drop(inner);
                self.run_completion(job_id, context);
                return JobSubmitResult::InvalidJob;
            }
            if let Some(p) = inner.pool.get_mut(parent) {
                p.outstanding_children += 1;
            }
        }

        let predecessors_remaining = inner
            .pool
            .get(job_id)
            .map(|r| r.predecessors_remaining)
            .unwrap_or(0);
        let mut ready_to_enqueue = None;
        if predecessors_remaining == 0 {
            if let Some(record) = inner.pool.get_mut(job_id) {
                record.state = JobState::Ready;
            }
            ready_to_enqueue = inner.queues.get(&queue_id).cloned();
        } else if let Some(record) = inner.pool.get_mut(job_id) {
            record.state = JobState::NotReady;
        }
        drop(inner);

        if let Some(queue) = ready_to_enqueue {
            queue.enqueue(job_id);
        }
        JobSubmitResult::Success
    }

    pub(crate) fn cancel_job(&self, context: &Context, job_id: JobId) -> JobState {
        let mut inner = self.inner.lock();
        let current_state = match inner.pool.get(job_id) {
            Some(record) => record.state,
            None => return JobState::Uninitialized,
        };
        match current_state {
            JobState::Uninitialized
            | JobState::Completed
            | JobState::Canceled
            | JobState::Running => return current_state,
            _ => {}
        }

        // Only the flag is set here, never the state: this job may already
        // have outstanding_children (created under it before it was ever
        // submitted), and writing CANCELED up front would let a concurrent
        // `job_state` read observe a terminal state with outstanding
        // children still > 0 (I3). `finalize_locked` performs the actual
        // transition once it confirms outstanding_children == 0, deferring
        // otherwise exactly as `complete_job` already does.
        if let Some(record) = inner.pool.get_mut(job_id) {
            record.cancel_flag = true;
        }
        mark_descendant_cancel_flags(&mut inner.pool, job_id);
        drop(inner);

        self.run_completion(job_id, context);
        JobState::Canceled
    }

    pub(crate) fn execute_job(&self, job_id: JobId, context: &Context) -> i32 {
        let mut body = {
            let mut inner = self.inner.lock();
            let record = inner
                .pool
                .get_mut(job_id)
                .expect("execute_job called with a stale or unknown job id");
            debug_assert_eq!(record.state, JobState::Ready);
            if record.cancel_flag {
                // Inherited from an ancestor's cancellation, or set between
                // enqueue and dequeue: EXECUTE never runs, but CLEANUP still
                // will, via the normal completion path below. The state is
                // left as READY here, not written to CANCELED directly —
                // this job may already have outstanding_children of its own
                // (submitted under it before its own EXECUTE ran), and only
                // `finalize_locked` (called from `complete_job` right after
                // this function returns) may write a terminal state, after
                // confirming outstanding_children == 0 (I3).
                None
            } else {
                record.state = JobState::Running;
                Some(record.body.take())
            }
        };
        let Some(mut body) = body else {
            return 0;
        };

        let result_code = match body.as_mut() {
            Some(body) => {
                match catch_unwind(AssertUnwindSafe(|| body(JobCallType::Execute, job_id, context))) {
                    Ok(code) => code,
                    Err(_) => {
                        error!(
                            "{}",
                            log_tsv(&[("event", "job_execute_panic"), ("job", &job_id.to_string())])
                        );
                        -1
                    }
                }
            }
            None => 0,
        };

        {
            let mut inner = self.inner.lock();
            if let Some(record) = inner.pool.get_mut(job_id) {
                record.result_code = result_code;
                record.body = body;
            }
        }
        result_code
    }

    pub(crate) fn complete_job(&self, context: &Context, job_id: JobId) {
        self.run_completion(job_id, context);
    }

    fn run_completion(&self, job_id: JobId, context: &Context) {
        let outcome = {
            let mut inner = self.inner.lock();
            finalize_locked(&mut inner.pool, job_id, &inner.queues)
        };
        let Some(mut outcome) = outcome else {
            return;
        };

        for (queue, waiter_id) in outcome.to_wake.drain(..) {
            queue.enqueue(waiter_id);
        }

        if let Some(body) = outcome.body.as_mut() {
            let result = catch_unwind(AssertUnwindSafe(|| {
                body(JobCallType::Cleanup, job_id, context)
            }));
            if result.is_err() {
                error!(
                    "{}",
                    log_tsv(&[("event", "job_cleanup_panic"), ("job", &job_id.to_string())])
                );
            }
        }

        {
            let mut inner = self.inner.lock();
            inner.pool.free(job_id);
        }

        if let Some(parent_id) = outcome.parent_to_rollup {
            self.on_child_completed(parent_id, context);
        }
    }

    fn on_child_completed(&self, parent_id: JobId, context: &Context) {
        let should_retry = {
            let mut inner = self.inner.lock();
            match inner.pool.get_mut(parent_id) {
                Some(parent) => {
                    parent.outstanding_children = parent.outstanding_children.saturating_sub(1);
                    parent.outstanding_children == 0 && parent.awaiting_completion
                }
                None => false,
            }
        };
        if should_retry {
            self.run_completion(parent_id, context);
        }
    }
}

/// Step 1+2+3+5(partial): decide whether `job_id` can finalize right now
/// (deferring if children remain outstanding), transition it to its
/// terminal state, and collect the waiters to wake and the body to clean
/// up. Steps 4 and the rest of 5/6 happen in the caller, outside the lock.
fn finalize_locked(
    pool: &mut JobPool,
    job_id: JobId,
    queues: &HashMap<QueueId, Arc<WaitQueue>>,
) -> Option<CompletionOutcome> {
    let record = pool.get_mut(job_id)?;
    if record.outstanding_children > 0 {
        record.awaiting_completion = true;
        return None;
    }

    // `cancel_flag`, not the current `state`, decides the terminal state:
    // a fast-cancel site only ever sets the flag (never writes a terminal
    // state directly), so I3 (outstanding_children == 0 whenever state is
    // terminal) cannot be observed violated between the flag being set and
    // this finalization actually running.
    let final_state = if record.cancel_flag {
        JobState::Canceled
    } else {
        JobState::Completed
    };
    record.state = final_state;
    let waiters = std::mem::take(&mut record.waiters);
    let parent = record.parent;
    let body = record.body.take();

    let mut to_wake = Vec::new();
    for waiter_id in waiters {
        let Some(waiter) = pool.get_mut(waiter_id) else {
            continue;
        };
        if waiter.state.is_terminal() {
            // Lazily dropped: the waiter was canceled independently while
            // still on this job's waiter list.
            continue;
        }
        waiter.predecessors_remaining = waiter.predecessors_remaining.saturating_sub(1);
        if waiter.predecessors_remaining == 0 && waiter.state == JobState::NotReady {
            waiter.state = JobState::Ready;
            if let Some(queue) = queues.get(&waiter.target_queue) {
                to_wake.push((Arc::clone(queue), waiter_id));
            }
        }
    }

    Some(CompletionOutcome {
        to_wake,
        body,
        parent_to_rollup: if parent.is_none() { None } else { Some(parent) },
    })
}

/// Walk every descendant of `job_id` reachable via the intrusive
/// `first_child`/`next_sibling` lists and mark `cancel_flag` on the ones
/// not already running or terminal (I6). A flagged `NotSubmitted` job
/// resolves the next time it is submitted (see `Scheduler::submit_job`); a
/// flagged `NotReady`/`Ready` job resolves at its next completion or
/// `EXECUTE` attempt respectively. Running or already-terminal descendants
/// are left alone: they either run to completion cooperatively or have
/// already finished.
fn mark_descendant_cancel_flags(pool: &mut JobPool, job_id: JobId) {
    let mut stack = vec![job_id];
    while let Some(current) = stack.pop() {
        let mut child_index = pool.get(current).and_then(|r| r.first_child);
        while let Some(index) = child_index {
            let Some(child_id) = pool.id_at(index) else {
                break;
            };
            let next_sibling = match pool.get_mut(child_id) {
                Some(child) => {
                    if !matches!(child.state, JobState::Running) && !child.state.is_terminal() {
                        child.cancel_flag = true;
                    }
                    child.next_sibling
                }
                None => None,
            };
            stack.push(child_id);
            child_index = next_sibling;
        }
    }
}
