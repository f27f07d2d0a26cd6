//! Pending wake-ups of suspended processes.

use std::cmp::Ordering;

use crate::async_mode::hold_future::HoldPromise;
use crate::process::ProcessId;

/// Event identifier, equals to the insertion counter of the event queue.
pub type EventId = u64;

/// Scheduled wake-up of a process suspended in a timed wait.
///
/// Events are ordered by `(time, id)`, so events with equal time are dispatched in insertion order.
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Time when the process should be resumed.
    pub time: f64,
    /// Process waiting for this event.
    pub process: ProcessId,
    pub(crate) promise: HoldPromise,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Reversed to turn std BinaryHeap into a min-heap.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
