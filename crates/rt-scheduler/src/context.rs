//! Thread-affine handle through which a thread drives the scheduler.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::callback::JobBody;
use crate::job::{JobId, JobState, JobSubmitResult, JobSubmitType};
use crate::queue::{Dequeued, QueueId};
use crate::scheduler::{Scheduler, ThreadId};

/// Small-buffer-optimized staging for a submit call's dependency list — the
/// common case (0-4 dependencies) never touches the heap. It is rebuilt
/// per call rather than cached on `Context`, since a job body only ever
/// sees a shared `&Context` and may itself call `submit_job` reentrantly
/// while spawning children.
type DepScratch = SmallVec<[JobId; 4]>;

/// A thread-affine handle batching scheduler operations for one thread.
///
/// Every method takes `&self`, not `&mut self`: a job body receives only a
/// shared `&Context` (see [`crate::callback::JobBody`]) and must still be
/// able to create and submit its own child jobs from inside `EXECUTE`. All
/// actual mutation happens behind the scheduler's own lock, so a shared
/// `Context` is sufficient; nothing here needs a private mutable cache.
///
/// `Context` is not safe to share across threads or move between them
/// mid-use: every method debug-asserts it is called from the thread that
/// created it. This is documented rather than enforced with `!Send`/
/// `!Sync` markers, because nothing about pool or graph correctness
/// actually depends on thread affinity — both are guarded by the
/// scheduler's own lock — so the assertion is a misuse detector, not a
/// soundness requirement.
pub struct Context {
    scheduler: Arc<Scheduler>,
    context_id: u64,
    default_queue: QueueId,
    owner_thread: ThreadId,
}

/// Outcome of running one job via [`Context::run_next_job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A job ran and was completed; carries its `result_code`.
    Ran(i32),
    /// The default queue's signal was non-zero; no job ran.
    Signaled,
}

impl Context {
    pub(crate) fn new(
        scheduler: Arc<Scheduler>,
        context_id: u64,
        default_queue: QueueId,
        owner_thread: ThreadId,
    ) -> Self {
        Self {
            scheduler,
            context_id,
            default_queue,
            owner_thread,
        }
    }

    pub(crate) fn context_id(&self) -> u64 {
        self.context_id
    }

    pub fn default_queue(&self) -> QueueId {
        self.default_queue
    }

    fn assert_owner(&self) {
        debug_assert_eq!(
            self.owner_thread,
            std::thread::current().id(),
            "Context used from a thread other than the one that created it"
        );
    }

    /// Create a new job in `NOT_SUBMITTED` state, optionally as a child of
    /// `parent`. The job runs on this context's default queue unless
    /// `submit_job` is given an explicit target queue.
    pub fn create_job(
        &self,
        body: Option<JobBody>,
        parent: JobId,
    ) -> Result<JobId, crate::error::SchedulerError> {
        self.assert_owner();
        self.scheduler.create_job(parent, self.default_queue, body)
    }

    pub fn submit_job(
        &self,
        job_id: JobId,
        submit_type: JobSubmitType,
        target_queue: Option<QueueId>,
        dependencies: &[JobId],
    ) -> JobSubmitResult {
        self.assert_owner();
        let mut scratch: DepScratch = SmallVec::new();
        scratch.extend_from_slice(dependencies);
        self.scheduler
            .submit_job(self, job_id, submit_type, target_queue, &scratch)
    }

    pub fn cancel_job(&self, job_id: JobId) -> JobState {
        self.assert_owner();
        self.scheduler.cancel_job(self, job_id)
    }

    pub fn complete_job(&self, job_id: JobId) {
        self.assert_owner();
        self.scheduler.complete_job(self, job_id);
    }

    /// Cooperative wait: while `job_id` is not terminal, run other ready
    /// jobs from the default queue instead of blocking idly. Returns
    /// `true` once `job_id` reaches a terminal state, `false` if the
    /// default queue becomes signaled first.
    ///
    /// Must not be called from a thread that is the only consumer of a
    /// queue fed solely by other workers waiting the same way — with
    /// nothing left to dequeue, this becomes a livelock, not a deadlock
    /// this function can detect on its own.
    pub fn wait_for_job(&self, job_id: JobId) -> bool {
        self.assert_owner();
        loop {
            match self.scheduler.job_state(job_id) {
                Some(state) if state.is_terminal() => return true,
                None => return true,
                _ => {}
            }
            match self.run_next_job() {
                RunOutcome::Ran(_) => continue,
                RunOutcome::Signaled => return false,
            }
        }
    }

    /// Block on the default queue; on a job, execute it in `EXECUTE` mode
    /// and complete it. On signal, return `Signaled`.
    pub fn run_next_job(&self) -> RunOutcome {
        self.assert_owner();
        let Some(queue) = self.scheduler.queue_for(self.default_queue) else {
            return RunOutcome::Signaled;
        };
        match queue.dequeue_or_wait() {
            Dequeued::Signaled(_) => RunOutcome::Signaled,
            Dequeued::Job(job_id) => {
                let code = self.scheduler.execute_job(job_id, self);
                self.scheduler.complete_job(self, job_id);
                RunOutcome::Ran(code)
            }
        }
    }

    /// Same as [`Context::run_next_job`], except completion is deferred to
    /// a later explicit [`Context::complete_job`] call — for jobs whose
    /// completion is finalized by some external event.
    pub fn run_next_job_without_completion(&self) -> Option<JobId> {
        self.assert_owner();
        let queue = self.scheduler.queue_for(self.default_queue)?;
        match queue.dequeue_or_wait() {
            Dequeued::Signaled(_) => None,
            Dequeued::Job(job_id) => {
                self.scheduler.execute_job(job_id, self);
                Some(job_id)
            }
        }
    }
}
