//! The callback adapter boundary: the narrow seam between the scheduler and
//! whatever a job body actually does.
//!
//! The scheduler never inspects a job's body beyond invoking it with a mode
//! and a job id; unpacking arguments, invoking user code, and releasing
//! host-owned resources in `CLEANUP` are the adapter's job, not the
//! scheduler's. In a dynamically-typed host this boundary is where late-bound
//! callables and argument tuples get unpacked; here it is simply a boxed
//! closure, since Rust's type system lets us erase the concrete body type
//! safely without a raw-pointer payload-and-destructor pair.

use crate::context::Context;
use crate::job::{JobCallType, JobId};

/// A job's body: invoked once in `EXECUTE` (unless canceled before
/// execution) and exactly once in `CLEANUP`, regardless of outcome.
///
/// The closure owns whatever host-side argument/result storage it needs;
/// returning from `CLEANUP` is this closure's only chance to release it.
pub type JobBody = Box<dyn FnMut(JobCallType, JobId, &Context) -> i32 + Send>;
