//! Capacity-bounded server pool.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::async_mode::request_future::{GrantState, RequestFuture};
use crate::error::{SimError, SimResult};
use crate::log_trace;
use crate::monitor::{SampleMetric, TimeWeighted};
use crate::process::ProcessId;
use crate::state::SimulationState;

struct PendingRequest {
    process: ProcessId,
    requested_at: f64,
    grant: Rc<RefCell<GrantState>>,
}

struct ResourceState {
    capacity: u32,
    claimed: IndexSet<ProcessId>,
    wait_line: VecDeque<PendingRequest>,
    occupancy: TimeWeighted,
    wait_times: SampleMetric,
    requests: u64,
    served: u64,
}

impl ResourceState {
    fn occupancy_sample(&self) -> f64 {
        self.claimed.len() as f64 / self.capacity as f64
    }

    fn has_free_units(&self) -> bool {
        (self.claimed.len() as u32) < self.capacity
    }

    // Grants free units to the wait line head until the capacity is saturated or the line is empty.
    fn grant_waiting(&mut self, now: f64) -> usize {
        let mut granted = 0;
        while self.has_free_units() {
            let Some(request) = self.wait_line.pop_front() else {
                break;
            };
            let wait_time = now - request.requested_at;
            self.claimed.insert(request.process);
            self.wait_times.add(wait_time);
            request.grant.borrow_mut().complete(wait_time);
            granted += 1;
        }
        granted
    }

    fn record_occupancy(&mut self, now: f64) {
        let level = self.occupancy_sample();
        self.occupancy.update(now, level);
    }
}

/// Models a pool of identical servers (e.g. the windows of one counter type) which processes acquire and release.
///
/// At most `capacity` processes hold the resource at any time, others wait in a FIFO wait line.
/// The capacity can be changed at runtime. Reducing it below the number of current holders does not evict anyone:
/// new grants are suspended until enough holders release the resource.
///
/// # Examples
///
/// ```rust
/// use dinesim_core::Simulation;
///
/// let mut sim = Simulation::new(123);
/// let window = sim.create_resource("window", 1).unwrap();
/// for i in 0..3 {
///     let window = window.clone();
///     sim.spawn_process(format!("client-{}", i), move |ctx| async move {
///         ctx.request(&window).await;
///         ctx.hold(10.).await?;
///         ctx.release(&window)
///     });
/// }
/// sim.step_until_no_events();
/// assert_eq!(sim.time(), 30.);
/// assert_eq!(window.served_count(), 3);
/// assert_eq!(window.mean_wait_time(), 10.);
/// ```
pub struct Resource {
    name: String,
    state: RefCell<ResourceState>,
    sim_state: Rc<RefCell<SimulationState>>,
}

impl Resource {
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
            state: RefCell::new(ResourceState {
                capacity,
                claimed: IndexSet::new(),
                wait_line: VecDeque::new(),
                occupancy: TimeWeighted::new(now, 0.),
                wait_times: SampleMetric::default(),
                requests: 0,
                served: 0,
            }),
            sim_state,
        })
    }

    /// Returns the resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Requests one unit of the resource for the process.
    ///
    /// If a unit is free, it is granted immediately and the returned future is ready.
    /// Otherwise the process is appended to the wait line and the future resolves once the process
    /// reaches the head of the line and a unit is freed by [`release`](Self::release)
    /// or by a capacity increase. The future outputs the time spent waiting.
    pub fn request(self: &Rc<Self>, process: ProcessId) -> RequestFuture {
        let now = self.time();
        let mut state = self.state.borrow_mut();
        state.requests += 1;
        let grant = if state.has_free_units() && state.wait_line.is_empty() {
            state.claimed.insert(process);
            state.wait_times.add(0.);
            state.record_occupancy(now);
            log_trace!(self, "granted to process {} immediately", process);
            Rc::new(RefCell::new(GrantState::granted(0.)))
        } else {
            let grant = Rc::new(RefCell::new(GrantState::default()));
            state.wait_line.push_back(PendingRequest {
                process,
                requested_at: now,
                grant: grant.clone(),
            });
            log_trace!(self, "process {} waits at position {}", process, state.wait_line.len());
            grant
        };
        drop(state);
        RequestFuture::new(self.clone(), process, grant)
    }

    /// Releases the unit held by the process and grants freed units to waiting processes in FIFO order.
    ///
    /// Fails with [`SimError::NotHeld`] if the process does not hold the resource.
    pub fn release(&self, process: ProcessId) -> SimResult<()> {
        let now = self.time();
        let mut state = self.state.borrow_mut();
        if !state.claimed.shift_remove(&process) {
            return Err(SimError::NotHeld {
                resource: self.name.clone(),
                process,
            });
        }
        state.served += 1;
        let granted = state.grant_waiting(now);
        state.record_occupancy(now);
        log_trace!(self, "released by process {}, granted to {} waiting", process, granted);
        Ok(())
    }

    /// Changes the capacity.
    ///
    /// On increase, waiting processes are granted in FIFO order until the new capacity is saturated.
    /// On decrease, current holders keep the resource until they release it.
    /// Fails with [`SimError::InvalidCapacity`] if `capacity` is 0.
    pub fn set_capacity(&self, capacity: u32) -> SimResult<()> {
        if capacity == 0 {
            return Err(SimError::InvalidCapacity {
                name: self.name.clone(),
                capacity,
            });
        }
        let now = self.time();
        let mut state = self.state.borrow_mut();
        let old = state.capacity;
        state.capacity = capacity;
        let granted = state.grant_waiting(now);
        state.record_occupancy(now);
        log_trace!(self, "capacity changed {} -> {}, granted to {} waiting", old, capacity, granted);
        Ok(())
    }

    // Called by a dropped RequestFuture which was not granted.
    pub(crate) fn cancel_request(&self, process: ProcessId, grant: &Rc<RefCell<GrantState>>) {
        let mut state = self.state.borrow_mut();
        state
            .wait_line
            .retain(|r| !(r.process == process && Rc::ptr_eq(&r.grant, grant)));
    }

    /// Returns the current capacity.
    pub fn capacity(&self) -> u32 {
        self.state.borrow().capacity
    }

    /// Returns the number of processes holding the resource.
    pub fn claimed_count(&self) -> u32 {
        self.state.borrow().claimed.len() as u32
    }

    /// Returns the processes holding the resource in order of their grants.
    pub fn claimers(&self) -> Vec<ProcessId> {
        self.state.borrow().claimed.iter().copied().collect()
    }

    /// Returns `true` if the process holds the resource.
    pub fn is_held_by(&self, process: ProcessId) -> bool {
        self.state.borrow().claimed.contains(&process)
    }

    /// Returns the number of processes in the wait line.
    pub fn waiting_count(&self) -> usize {
        self.state.borrow().wait_line.len()
    }

    /// Returns the processes in the wait line, head first.
    pub fn requesters(&self) -> Vec<ProcessId> {
        self.state.borrow().wait_line.iter().map(|r| r.process).collect()
    }

    /// Returns the current fraction of capacity claimed, `claimed / capacity`.
    ///
    /// May exceed 1 after the capacity was reduced below the number of holders.
    pub fn occupancy_sample(&self) -> f64 {
        self.state.borrow().occupancy_sample()
    }

    /// Returns the occupancy averaged over simulation time since the resource creation.
    pub fn mean_occupancy(&self) -> f64 {
        let now = self.time();
        self.state.borrow().occupancy.mean(now)
    }

    /// Returns the statistics of waiting times of granted requests.
    pub fn wait_times(&self) -> SampleMetric {
        self.state.borrow().wait_times.clone()
    }

    /// Returns the mean waiting time of granted requests, 0 if nothing was granted yet.
    pub fn mean_wait_time(&self) -> f64 {
        self.state.borrow().wait_times.mean()
    }

    /// Returns the total number of requests.
    pub fn request_count(&self) -> u64 {
        self.state.borrow().requests
    }

    /// Returns the number of completed releases.
    pub fn served_count(&self) -> u64 {
        self.state.borrow().served
    }
}
