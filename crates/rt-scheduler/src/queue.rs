//! Blocking multi-producer/multi-consumer queue of ready job identifiers.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::job::{JobId, JobQueueSignal};

/// Opaque identifier for a queue, chosen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId(pub u64);

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue#{}", self.0)
    }
}

/// Result of a dequeue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dequeued {
    Job(JobId),
    Signaled(JobQueueSignal),
}

struct QueueState {
    items: VecDeque<JobId>,
    signal: i64,
}

/// A FIFO of ready job identifiers with an out-of-band signal slot.
///
/// Once `signal` is non-zero, every `dequeue_or_wait` call returns
/// `Signaled` immediately, regardless of queued work — shutdown (and any
/// other out-of-band condition) always wins over pending jobs.
pub struct WaitQueue {
    state: Mutex<QueueState>,
    condvar: Condvar,
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                signal: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Append a ready job and wake one sleeping consumer.
    pub fn enqueue(&self, job_id: JobId) {
        let mut state = self.state.lock();
        state.items.push_back(job_id);
        self.condvar.notify_one();
    }

    /// Block until a job is available or the signal becomes non-zero.
    pub fn dequeue_or_wait(&self) -> Dequeued {
        let mut state = self.state.lock();
        loop {
            if state.signal != 0 {
                return Dequeued::Signaled(JobQueueSignal::from_raw(state.signal));
            }
            if let Some(job_id) = state.items.pop_front() {
                return Dequeued::Job(job_id);
            }
            self.condvar.wait(&mut state);
        }
    }

    /// Additive sugar over [`WaitQueue::dequeue_or_wait`]: bounds the wait
    /// by `timeout`, returning `None` if neither a job nor a signal arrives
    /// in time. The core, spec-mandated contract remains the timeout-less
    /// form above; this exists for hosts embedding the scheduler in a
    /// larger event loop that cannot block indefinitely.
    pub fn dequeue_or_wait_timeout(&self, timeout: Duration) -> Option<Dequeued> {
        let mut state = self.state.lock();
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if state.signal != 0 {
                return Some(Dequeued::Signaled(JobQueueSignal::from_raw(state.signal)));
            }
            if let Some(job_id) = state.items.pop_front() {
                return Some(Dequeued::Job(job_id));
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return None;
            }
            let result = self.condvar.wait_for(&mut state, deadline - now);
            if result.timed_out() && state.signal == 0 && state.items.is_empty() {
                return None;
            }
        }
    }

    /// Set the signal slot and wake every sleeper.
    pub fn signal(&self, signal: JobQueueSignal) {
        let mut state = self.state.lock();
        state.signal = signal.as_raw();
        self.condvar.notify_all();
    }

    pub fn peek_signal(&self) -> JobQueueSignal {
        JobQueueSignal::from_raw(self.state.lock().signal)
    }

    /// Drop all queued identifiers without running them. Jobs discarded
    /// this way stay in `READY` state forever unless separately canceled;
    /// this is meant for shutdown after a `TERMINATE` signal.
    pub fn flush(&self) {
        self.state.lock().items.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
