//! Error types for pool construction and scheduler operation.

/// Errors reported synchronously when constructing a [`crate::JobPool`]
/// (equivalently, when constructing a [`crate::Scheduler`]).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolConfigError {
    #[error("job pool capacity must be non-zero")]
    CapacityZero,

    #[error("job pool capacity {0} must be a power of two")]
    CapacityNotPowerOfTwo(u32),
}

/// Errors reported by scheduler operations outside the `JobSubmitResult`
/// result-code path (that path is reserved, per the design, for expected
/// submission outcomes; this enum covers configuration and programmer
/// errors).
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid scheduler configuration")]
    InvalidConfig(#[from] PoolConfigError),

    #[error("job pool is exhausted and cannot grow")]
    PoolExhausted,

    #[error("parent job is unknown or already terminal")]
    InvalidParent,
}
