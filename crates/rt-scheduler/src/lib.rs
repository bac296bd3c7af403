//! A cooperative fork/join job scheduler: parent/child relationships,
//! dependency edges, bounded waiter lists, and signal-driven shutdown.
//!
//! Workers are host-created OS threads that each acquire a [`Context`] and
//! loop on [`Context::run_next_job`]. Producers create jobs through a
//! context, submit them with optional dependencies and a parent, and the
//! scheduler tracks readiness, runs bodies through the [`callback`]
//! boundary, and rolls completion up through the parent/child graph.
//!
//! No work stealing, no preemption, no priority classes: running jobs run
//! to completion, and idle workers cooperate by running other ready work
//! while waiting rather than spinning.

pub mod callback;
mod context;
mod diagnostics;
mod emit;
mod error;
mod job;
mod pool;
mod queue;
mod scheduler;

pub use context::{Context, RunOutcome};
pub use diagnostics::install_deadlock_detector;
pub use error::{PoolConfigError, SchedulerError};
pub use job::{JobCallType, JobId, JobQueueSignal, JobState, JobSubmitResult, JobSubmitType};
pub use queue::{Dequeued, QueueId, WaitQueue};
pub use scheduler::{Scheduler, SchedulerConfig, ThreadId};
