//! Simulation configuration and execution.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use log::debug;
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;
use serde_json::json;

use crate::async_mode::executor::{Executor, TaskPoll};
use crate::context::{spawn_process, ProcessContext};
use crate::error::{SimError, SimResult};
use crate::log::{get_colored, log_process_failure};
use crate::process::ProcessId;
use crate::queue::Queue;
use crate::resource::Resource;
use crate::state::SimulationState;

/// Reason why [`Simulation::run`] has returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The end time was reached, events scheduled after it were discarded.
    EndReached,
    /// No events were left before the end time.
    Exhausted,
}

/// Represents a simulation, provides methods for its configuration and execution.
///
/// All processes share a single flow of control: exactly one process runs at any moment and it runs until
/// it suspends in [`ProcessContext::hold`] or [`ProcessContext::request`]. Processes woken at the same
/// simulation time are resumed in the order they were woken, events with equal time in the order they were
/// scheduled, so a run is fully determined by the random seed.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    executor: Executor,
    failure: Option<SimError>,
}

impl Simulation {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        let executor = Executor::new();
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed, executor.spawner()))),
            executor,
            failure: None,
        }
    }

    /// Spawns a new process with the given name, returns the process id.
    ///
    /// `body` receives the context of the new process and returns the process future.
    /// The process starts running at the current simulation time, after already ready processes.
    /// If the process returns an error, the simulation stops (see [`failure`](Self::failure)).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dinesim_core::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let id = sim.spawn_process("sleeper", |ctx| async move {
    ///     ctx.hold(5.).await?;
    ///     assert_eq!(ctx.time(), 5.);
    ///     Ok(())
    /// });
    /// assert_eq!(id, 0);
    /// sim.step_until_no_events();
    /// assert_eq!(sim.time(), 5.);
    /// ```
    pub fn spawn_process<S, F, Fut>(&mut self, name: S, body: F) -> ProcessId
    where
        S: AsRef<str>,
        F: FnOnce(ProcessContext) -> Fut,
        Fut: Future<Output = SimResult<()>> + 'static,
    {
        let id = spawn_process(&self.sim_state, name.as_ref(), body);
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Spawned process: {}",
            self.time(),
            get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
        id
    }

    /// Creates a context which is not backed by a running process.
    ///
    /// Useful to act on resources and queues from outside of processes, e.g. in tests.
    pub fn create_context<S>(&mut self, name: S) -> ProcessContext
    where
        S: AsRef<str>,
    {
        let id = self.sim_state.borrow_mut().register_process(name.as_ref());
        ProcessContext::new(id, name.as_ref(), self.sim_state.clone())
    }

    /// Creates a resource with the given capacity.
    ///
    /// Fails with [`SimError::InvalidCapacity`] if `capacity` is 0.
    pub fn create_resource<S>(&mut self, name: S, capacity: u32) -> SimResult<Rc<Resource>>
    where
        S: AsRef<str>,
    {
        let resource = Resource::new(name.as_ref(), capacity, self.sim_state.clone())?;
        Ok(Rc::new(resource))
    }

    /// Creates a queue with the given capacity.
    ///
    /// Fails with [`SimError::InvalidCapacity`] if `capacity` is 0.
    pub fn create_queue<S>(&mut self, name: S, capacity: u32) -> SimResult<Rc<Queue>>
    where
        S: AsRef<str>,
    {
        let queue = Queue::new(name.as_ref(), capacity, self.sim_state.clone())?;
        Ok(Rc::new(queue))
    }

    /// Returns the name of process by its identifier.
    pub fn lookup_name(&self, id: ProcessId) -> Option<String> {
        self.sim_state.borrow().lookup_name(id).map(|name| name.to_owned())
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Returns the error of the process which stopped the simulation, if any.
    pub fn failure(&self) -> Option<&SimError> {
        self.failure.as_ref()
    }

    // Polls one ready process, returns false if there are none.
    fn process_task(&mut self) -> bool {
        match self.executor.process_task() {
            None => false,
            Some(TaskPoll::Finished { id, name, result }) => {
                match result {
                    Ok(()) => debug!(
                        target: "simulation",
                        "[{:.3} {} simulation] Process finished: {}",
                        self.time(),
                        get_colored("DEBUG", colored::Color::Blue),
                        json!({"name": name, "id": id})
                    ),
                    Err(reason) => {
                        let time = self.time();
                        log_process_failure(time, &name, &reason);
                        self.failure = Some(SimError::ProcessFailed {
                            process: id,
                            name,
                            time,
                            reason: Box::new(reason),
                        });
                    }
                }
                true
            }
            Some(_) => true,
        }
    }

    // Runs processes until none are ready at the current time.
    fn run_ready(&mut self) -> SimResult<()> {
        while self.failure.is_none() && self.process_task() {}
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Performs a single step through the simulation.
    ///
    /// Polls the next ready process if there is one. Otherwise takes the next event from the queue,
    /// advances the simulation time to the event time and wakes the process waiting for it.
    ///
    /// Returns `false` if no progress can be made: there are no ready processes and no pending events,
    /// or a process has failed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dinesim_core::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// sim.spawn_process("sleeper", |ctx| async move { ctx.hold(1.2).await });
    /// assert!(sim.step()); // process starts and schedules its wake-up
    /// assert!(sim.step()); // time advances to 1.2
    /// assert_eq!(sim.time(), 1.2);
    /// assert!(sim.step()); // process finishes
    /// assert!(!sim.step());
    /// ```
    pub fn step(&mut self) -> bool {
        if self.failure.is_some() {
            return false;
        }
        if self.process_task() {
            return true;
        }
        let next = self.sim_state.borrow_mut().next_event();
        match next {
            Some(event) => {
                event.promise.complete();
                true
            }
            None => false,
        }
    }

    /// Performs the specified number of steps through the simulation.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Steps through the simulation until there are no ready processes and pending events left.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Advances the clock to the next event and resumes its process.
    ///
    /// Processes which are ready at the current time are run first. After the wake-up, all processes made
    /// ready by it run to their next suspension point. Returns the new simulation time.
    ///
    /// Fails with [`SimError::Exhausted`] if there are no pending events,
    /// and with [`SimError::ProcessFailed`] if some process has returned an error.
    pub fn advance(&mut self) -> SimResult<f64> {
        self.run_ready()?;
        let next = self.sim_state.borrow_mut().next_event();
        let event = next.ok_or(SimError::Exhausted)?;
        event.promise.complete();
        self.run_ready()?;
        Ok(self.time())
    }

    /// Steps through the simulation while the next event time does not exceed `time`.
    ///
    /// Events scheduled after `time` are kept pending. Returns `true` if there are such events.
    pub fn step_until_time(&mut self, time: f64) -> SimResult<bool> {
        loop {
            self.run_ready()?;
            let next_time = self.sim_state.borrow_mut().peek_time();
            match next_time {
                None => return Ok(false),
                Some(t) if t > time => return Ok(true),
                Some(_) => {
                    self.advance()?;
                }
            }
        }
    }

    /// Runs the simulation until `end_time`.
    ///
    /// Events due at or before `end_time` are processed. The run stops when the end time is reached or the event
    /// queue is exhausted, whichever happens first. Events scheduled after `end_time` are discarded without
    /// resuming their processes, and the clock is moved to `end_time`.
    ///
    /// Fails with [`SimError::ProcessFailed`] if some process has returned an error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dinesim_core::{RunOutcome, Simulation};
    ///
    /// let mut sim = Simulation::new(123);
    /// sim.spawn_process("ticker", |ctx| async move {
    ///     loop {
    ///         ctx.hold(1.).await?;
    ///     }
    /// });
    /// assert_eq!(sim.run(10.5).unwrap(), RunOutcome::EndReached);
    /// assert_eq!(sim.time(), 10.5);
    /// assert_eq!(sim.pending_event_count(), 0);
    /// ```
    pub fn run(&mut self, end_time: f64) -> SimResult<RunOutcome> {
        let more_events = self.step_until_time(end_time)?;
        let discarded = {
            let mut state = self.sim_state.borrow_mut();
            state.set_time(end_time);
            state.discard_events()
        };
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Run finished: {}",
            self.time(),
            get_colored("DEBUG", colored::Color::Blue),
            json!({"discarded_events": discarded, "active_processes": self.active_process_count()})
        );
        Ok(if more_events {
            RunOutcome::EndReached
        } else {
            RunOutcome::Exhausted
        })
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range
    /// using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution
    /// using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        self.sim_state.borrow_mut().sample_from_distribution(dist)
    }

    /// Returns the total number of scheduled events, including cancelled ones.
    pub fn event_count(&self) -> u64 {
        self.sim_state.borrow().event_count()
    }

    /// Returns the number of events waiting to be dispatched.
    pub fn pending_event_count(&self) -> usize {
        self.sim_state.borrow().pending_event_count()
    }

    /// Returns the number of processes which have not finished yet.
    pub fn active_process_count(&self) -> usize {
        self.executor.active_count()
    }

    /// Returns `true` if some processes are ready to run at the current time.
    pub fn has_ready_processes(&self) -> bool {
        self.executor.has_ready_tasks()
    }
}
