//! Read-only views of the hall for rendering.

use serde::Serialize;

use crate::customer::CustomerState;
use crate::facility::{CounterId, CustomerId, FacilityState};

/// Named points of a customer route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Waypoint {
    Entrance,
    QueueTail,
    QueueSlot,
    Counter,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CounterView {
    pub name: String,
    pub queue_length: usize,
    pub claimed: u32,
    pub capacity: u32,
    pub in_flight: u32,
}

/// Position of a customer on the leg between two waypoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomerView {
    pub customer: CustomerId,
    pub counter: CounterId,
    pub state: CustomerState,
    pub from: Waypoint,
    pub to: Waypoint,
    /// Fraction of the leg covered, in `[0, 1]`.
    pub progress: f64,
    /// Position in the counter queue, head is 0.
    pub queue_position: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HallSnapshot {
    pub time: f64,
    pub counters: Vec<CounterView>,
    pub customers: Vec<CustomerView>,
}

fn leg_progress(elapsed: f64, duration: f64) -> f64 {
    if duration > 0. {
        (elapsed / duration).clamp(0., 1.)
    } else {
        1.
    }
}

impl HallSnapshot {
    /// Captures the hall at time `now`. Transit legs are interpolated linearly.
    pub fn take(facility: &FacilityState, now: f64, entrance_to_queue: f64, queue_to_tail: f64) -> Self {
        let counters = facility
            .counters()
            .map(|c| CounterView {
                name: c.name().to_string(),
                queue_length: c.queue().length(),
                claimed: c.resource().claimed_count(),
                capacity: c.resource().capacity(),
                in_flight: c.in_flight(),
            })
            .collect();

        let mut customers = Vec::new();
        for record in facility.customers().iter().filter(|r| r.state.is_in_system()) {
            let (Some(counter), Some(commit_time)) = (record.counter, record.commit_time) else {
                continue;
            };
            let queue = facility.counter(counter).queue();
            let (from, to, progress) = match record.state {
                CustomerState::Transiting => {
                    let elapsed = now - commit_time;
                    if elapsed < entrance_to_queue {
                        (
                            Waypoint::Entrance,
                            Waypoint::QueueTail,
                            leg_progress(elapsed, entrance_to_queue),
                        )
                    } else {
                        (
                            Waypoint::QueueTail,
                            Waypoint::QueueSlot,
                            leg_progress(elapsed - entrance_to_queue, queue_to_tail),
                        )
                    }
                }
                CustomerState::BeingServed => (Waypoint::QueueSlot, Waypoint::Counter, 1.),
                _ => (Waypoint::QueueSlot, Waypoint::Counter, 0.),
            };
            customers.push(CustomerView {
                customer: record.id,
                counter,
                state: record.state,
                from,
                to,
                progress,
                queue_position: queue.position(record.process),
            });
        }

        Self {
            time: now,
            counters,
            customers,
        }
    }
}
