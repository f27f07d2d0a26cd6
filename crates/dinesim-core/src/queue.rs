//! Visible queue membership.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::{SimError, SimResult};
use crate::log_trace;
use crate::monitor::{SampleMetric, TimeWeighted};
use crate::process::ProcessId;
use crate::state::SimulationState;

struct QueueState {
    capacity: u32,
    members: VecDeque<(ProcessId, f64)>,
    length: TimeWeighted,
    stays: SampleMetric,
    entered: u64,
}

/// Ordered collection of processes standing in line, in order of arrival.
///
/// Unlike the wait line of a [`Resource`](crate::resource::Resource), membership is managed explicitly
/// by processes via [`enter`](Self::enter) and [`leave`](Self::leave). The capacity is advisory: the queue
/// never rejects an `enter`, callers check the length against the capacity before entering.
///
/// The time between `enter` and `leave` of each member is recorded as length of stay.
pub struct Queue {
    name: String,
    state: RefCell<QueueState>,
    sim_state: Rc<RefCell<SimulationState>>,
}

impl Queue {
    pub(crate) fn new(name: &str, capacity: u32, sim_state: Rc<RefCell<SimulationState>>) -> SimResult<Self> {
        if capacity == 0 {
            return Err(SimError::InvalidCapacity {
                name: name.to_owned(),
                capacity,
            });
        }
        let now = sim_state.borrow().time();
        Ok(Self {
            name: name.to_owned(),
            state: RefCell::new(QueueState {
                capacity,
                members: VecDeque::new(),
                length: TimeWeighted::new(now, 0.),
                stays: SampleMetric::default(),
                entered: 0,
            }),
            sim_state,
        })
    }

    /// Returns the queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Appends the process to the tail of the queue.
    pub fn enter(&self, process: ProcessId) {
        let now = self.time();
        let mut state = self.state.borrow_mut();
        state.members.push_back((process, now));
        state.entered += 1;
        let len = state.members.len();
        state.length.update(now, len as f64);
        log_trace!(self, "process {} entered, length {}", process, len);
    }

    /// Removes the process from the queue.
    ///
    /// Fails with [`SimError::NotPresent`] if the process is not a member.
    pub fn leave(&self, process: ProcessId) -> SimResult<()> {
        let now = self.time();
        let mut state = self.state.borrow_mut();
        let Some(pos) = state.members.iter().position(|(p, _)| *p == process) else {
            return Err(SimError::NotPresent {
                queue: self.name.clone(),
                process,
            });
        };
        if let Some((_, entered_at)) = state.members.remove(pos) {
            state.stays.add(now - entered_at);
        }
        let len = state.members.len();
        state.length.update(now, len as f64);
        log_trace!(self, "process {} left, length {}", process, len);
        Ok(())
    }

    /// Returns the number of members.
    pub fn length(&self) -> usize {
        self.state.borrow().members.len()
    }

    /// Returns `true` if the queue has no members.
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Returns the current capacity.
    pub fn capacity(&self) -> u32 {
        self.state.borrow().capacity
    }

    /// Changes the capacity. Existing members are kept even if there are more of them than the new capacity.
    ///
    /// Fails with [`SimError::InvalidCapacity`] if `capacity` is 0.
    pub fn set_capacity(&self, capacity: u32) -> SimResult<()> {
        if capacity == 0 {
            return Err(SimError::InvalidCapacity {
                name: self.name.clone(),
                capacity,
            });
        }
        self.state.borrow_mut().capacity = capacity;
        Ok(())
    }

    /// Returns `true` if the process is a member.
    pub fn contains(&self, process: ProcessId) -> bool {
        self.position(process).is_some()
    }

    /// Returns the zero-based position of the process counting from the head.
    pub fn position(&self, process: ProcessId) -> Option<usize> {
        self.state.borrow().members.iter().position(|(p, _)| *p == process)
    }

    /// Returns the members in arrival order.
    pub fn members(&self) -> Vec<ProcessId> {
        self.state.borrow().members.iter().map(|(p, _)| *p).collect()
    }

    /// Returns the queue length averaged over simulation time since the queue creation.
    pub fn mean_length(&self) -> f64 {
        let now = self.time();
        self.state.borrow().length.mean(now)
    }

    /// Returns the statistics of completed stays (time between `enter` and `leave`).
    pub fn stays(&self) -> SampleMetric {
        self.state.borrow().stays.clone()
    }

    /// Returns the mean length of completed stays, 0 if nobody left the queue yet.
    pub fn mean_stay(&self) -> f64 {
        self.state.borrow().stays.mean()
    }

    /// Returns the total number of processes which entered the queue.
    pub fn entered_count(&self) -> u64 {
        self.state.borrow().entered
    }
}
