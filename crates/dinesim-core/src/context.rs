//! Accessing simulation from processes.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;

use crate::async_mode::{HoldFuture, RequestFuture};
use crate::error::SimResult;
use crate::process::ProcessId;
use crate::queue::Queue;
use crate::resource::Resource;
use crate::state::SimulationState;

/// A facade for accessing the simulation state from a process.
///
/// Each spawned process receives its own context, which identifies the process in resources and queues.
#[derive(Clone)]
pub struct ProcessContext {
    id: ProcessId,
    name: String,
    sim_state: Rc<RefCell<SimulationState>>,
}

impl ProcessContext {
    pub(crate) fn new(id: ProcessId, name: &str, sim_state: Rc<RefCell<SimulationState>>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            sim_state,
        }
    }

    /// Returns the identifier of the process.
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Returns the name of the process.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range
    /// using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution
    /// using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&self, dist: &Dist) -> T {
        self.sim_state.borrow_mut().sample_from_distribution(dist)
    }

    /// Suspends the process for `duration` units of simulation time.
    ///
    /// A process may have only one pending hold at a time.
    pub fn hold(&self, duration: f64) -> HoldFuture {
        HoldFuture::new(self.id, duration, self.sim_state.clone())
    }

    /// Requests a unit of the resource on behalf of this process, see [`Resource::request`].
    pub fn request(&self, resource: &Rc<Resource>) -> RequestFuture {
        resource.request(self.id)
    }

    /// Releases the resource held by this process, see [`Resource::release`].
    pub fn release(&self, resource: &Resource) -> SimResult<()> {
        resource.release(self.id)
    }

    /// Appends this process to the queue, see [`Queue::enter`].
    pub fn enter(&self, queue: &Queue) {
        queue.enter(self.id)
    }

    /// Removes this process from the queue, see [`Queue::leave`].
    pub fn leave(&self, queue: &Queue) -> SimResult<()> {
        queue.leave(self.id)
    }

    /// Spawns a new process, see [`Simulation::spawn_process`](crate::Simulation::spawn_process).
    pub fn spawn_process<S, F, Fut>(&self, name: S, body: F) -> ProcessId
    where
        S: AsRef<str>,
        F: FnOnce(ProcessContext) -> Fut,
        Fut: Future<Output = SimResult<()>> + 'static,
    {
        spawn_process(&self.sim_state, name.as_ref(), body)
    }
}

pub(crate) fn spawn_process<F, Fut>(sim_state: &Rc<RefCell<SimulationState>>, name: &str, body: F) -> ProcessId
where
    F: FnOnce(ProcessContext) -> Fut,
    Fut: Future<Output = SimResult<()>> + 'static,
{
    let (id, spawner) = {
        let mut state = sim_state.borrow_mut();
        (state.register_process(name), state.spawner())
    };
    let ctx = ProcessContext::new(id, name, sim_state.clone());
    spawner.spawn(id, name, body(ctx));
    id
}
