//! Simulation errors.

use thiserror::Error;

use crate::process::ProcessId;

/// Errors raised by the scheduling core.
///
/// `InvalidDelay`, `HoldPending`, `NotHeld` and `NotPresent` are scheduling invariant violations: they indicate
/// a bug in process logic, not a recoverable runtime condition. When such an error escapes a process body, the run
/// loop stops and reports it as [`SimError::ProcessFailed`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Attempt to schedule an event in the past.
    #[error("invalid delay {delay}: events can not be scheduled in the past")]
    InvalidDelay {
        /// Requested delay.
        delay: f64,
    },
    /// There are no pending events left.
    #[error("event queue is exhausted")]
    Exhausted,
    /// Process already has a pending timed wait.
    #[error("process {process} already has a pending hold")]
    HoldPending {
        /// Process which requested the second hold.
        process: ProcessId,
    },
    /// Resource or queue capacity must be at least 1.
    #[error("invalid capacity {capacity} for `{name}`: capacity must be at least 1")]
    InvalidCapacity {
        /// Name of resource or queue.
        name: String,
        /// Requested capacity.
        capacity: u32,
    },
    /// Process releases a resource it does not hold.
    #[error("process {process} does not hold resource `{resource}`")]
    NotHeld {
        /// Resource name.
        resource: String,
        /// Process which attempted the release.
        process: ProcessId,
    },
    /// Process leaves a queue it is not a member of.
    #[error("process {process} is not present in queue `{queue}`")]
    NotPresent {
        /// Queue name.
        queue: String,
        /// Process which attempted to leave.
        process: ProcessId,
    },
    /// Process body returned an error, the run loop was aborted.
    #[error("process `{name}` ({process}) failed at {time:.3}: {reason}")]
    ProcessFailed {
        /// Failed process.
        process: ProcessId,
        /// Name of failed process.
        name: String,
        /// Simulation time of failure.
        time: f64,
        /// Error returned by the process.
        reason: Box<SimError>,
    },
}

/// Shorthand result type used across the simulation core.
pub type SimResult<T> = Result<T, SimError>;
