//! Job identifiers, lifecycle states, and the in-pool job record.

use std::fmt;

use crate::callback::JobBody;
use crate::queue::QueueId;

/// Opaque handle to a job record, encoding a pool slot index and the
/// generation of its current occupant.
///
/// The all-zero value is reserved: it is never handed out by the pool (slot
/// 0 starts at generation 1 for exactly this reason) and doubles as both
/// `NONE` (no parent / no dependency) and `INVALID` (lookup miss), matching
/// the single zero sentinel the source spec collapses both into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct JobId(u64);

impl JobId {
    /// Sentinel meaning "no job" — used for `parent` and lookup failures.
    pub const NONE: JobId = JobId(0);
    /// Alias for [`JobId::NONE`]; the design treats them as the same value.
    pub const INVALID: JobId = JobId(0);

    pub(crate) fn new(index: u32, generation: u32) -> Self {
        JobId(((generation as u64) << 32) | index as u64)
    }

    pub(crate) fn index(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    pub(crate) fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "job#none")
        } else {
            write!(f, "job#{}g{}", self.index(), self.generation())
        }
    }
}

/// Job lifecycle state. Discriminants match the exported contract exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JobState {
    Uninitialized = 0,
    NotSubmitted = 1,
    NotReady = 2,
    Ready = 3,
    Running = 4,
    Completed = 5,
    Canceled = 6,
}

impl JobState {
    /// A job in a terminal state will never transition again; its slot is
    /// reclaimed once waiters and parent accounting have been handled.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Canceled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Uninitialized => "UNINITIALIZED",
            JobState::NotSubmitted => "NOT_SUBMITTED",
            JobState::NotReady => "NOT_READY",
            JobState::Ready => "READY",
            JobState::Running => "RUNNING",
            JobState::Completed => "COMPLETED",
            JobState::Canceled => "CANCELED",
        };
        f.write_str(name)
    }
}

/// How a job should be treated at submit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum JobSubmitType {
    Run = 0,
    Cancel = -1,
}

/// Outcome of a `submit_job` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum JobSubmitResult {
    Success = 0,
    InvalidJob = -1,
    TooManyWaiters = -2,
}

/// Mode passed to the callback adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobCallType {
    Execute = 0,
    Cleanup = 1,
}

/// A queue's out-of-band signal. Once non-zero, all dequeues short-circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobQueueSignal {
    Clear,
    Terminate,
    User(i64),
}

impl JobQueueSignal {
    pub fn as_raw(self) -> i64 {
        match self {
            JobQueueSignal::Clear => 0,
            JobQueueSignal::Terminate => 1,
            JobQueueSignal::User(v) => v,
        }
    }

    pub fn from_raw(value: i64) -> Self {
        match value {
            0 => JobQueueSignal::Clear,
            1 => JobQueueSignal::Terminate,
            v => JobQueueSignal::User(v),
        }
    }

    pub fn is_clear(self) -> bool {
        self.as_raw() == 0
    }
}

/// The record a pool slot carries while occupied.
///
/// `first_child`/`next_sibling` form an intrusive, index-linked children
/// list off the parent so cancellation can walk descendants without
/// scanning the whole pool.
pub(crate) struct JobRecord {
    pub state: JobState,
    pub parent: JobId,
    pub outstanding_children: u32,
    pub predecessors_remaining: u32,
    pub waiters: Vec<JobId>,
    pub target_queue: QueueId,
    pub body: Option<JobBody>,
    pub cancel_flag: bool,
    pub result_code: i32,
    /// Set when completion was attempted while children were still
    /// outstanding; rechecked each time a child finishes.
    pub awaiting_completion: bool,
    pub first_child: Option<u32>,
    pub next_sibling: Option<u32>,
}

impl JobRecord {
    pub(crate) fn new(parent: JobId, target_queue: QueueId, body: Option<JobBody>) -> Self {
        Self {
            state: JobState::NotSubmitted,
            parent,
            outstanding_children: 0,
            predecessors_remaining: 0,
            waiters: Vec::new(),
            target_queue,
            body,
            cancel_flag: false,
            result_code: 0,
            awaiting_completion: false,
            first_child: None,
            next_sibling: None,
        }
    }
}
