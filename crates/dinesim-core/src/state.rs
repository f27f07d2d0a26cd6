use std::collections::{BinaryHeap, HashMap, HashSet};

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::async_mode::executor::Spawner;
use crate::async_mode::hold_future::HoldPromise;
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId};
use crate::process::ProcessId;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

/// Clock, event queue and process registry shared by the simulation and all process contexts.
pub struct SimulationState {
    clock: f64,
    rand: Pcg64,
    events: BinaryHeap<Event>,
    cancelled_events: HashSet<EventId>,
    pending_holds: HashMap<ProcessId, EventId>,
    event_count: u64,

    process_names: Vec<String>,
    spawner: Spawner,
}

impl SimulationState {
    pub fn new(seed: u64, spawner: Spawner) -> Self {
        Self {
            clock: 0.0,
            rand: Pcg64::seed_from_u64(seed),
            events: BinaryHeap::new(),
            cancelled_events: HashSet::new(),
            pending_holds: HashMap::new(),
            event_count: 0,
            process_names: Vec::new(),
            spawner,
        }
    }

    // Processes -------------------------------------------------------------------------------------------------------

    pub fn register_process(&mut self, name: &str) -> ProcessId {
        let id = self.process_names.len() as ProcessId;
        self.process_names.push(name.to_owned());
        id
    }

    pub fn lookup_name(&self, id: ProcessId) -> Option<&str> {
        self.process_names.get(id as usize).map(|name| name.as_str())
    }

    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    // Clock -----------------------------------------------------------------------------------------------------------

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn set_time(&mut self, time: f64) {
        if time > self.clock {
            self.clock = time;
        }
    }

    // Randomness ------------------------------------------------------------------------------------------------------

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rand.gen_range(range)
    }

    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        dist.sample(&mut self.rand)
    }

    // Event queue -----------------------------------------------------------------------------------------------------

    pub fn schedule(&mut self, process: ProcessId, delay: f64, promise: HoldPromise) -> SimResult<EventId> {
        if delay.is_nan() || delay < -EPSILON {
            return Err(SimError::InvalidDelay { delay });
        }
        if self.pending_holds.contains_key(&process) {
            return Err(SimError::HoldPending { process });
        }
        let id = self.event_count;
        self.events.push(Event {
            id,
            time: self.clock + delay.max(0.),
            process,
            promise,
        });
        self.pending_holds.insert(process, id);
        self.event_count += 1;
        Ok(id)
    }

    pub fn next_event(&mut self) -> Option<Event> {
        while let Some(event) = self.events.pop() {
            if !self.cancelled_events.remove(&event.id) {
                self.pending_holds.remove(&event.process);
                self.clock = event.time;
                return Some(event);
            }
        }
        None
    }

    pub fn peek_time(&mut self) -> Option<f64> {
        loop {
            let id = self.events.peek()?.id;
            if self.cancelled_events.remove(&id) {
                self.events.pop();
            } else {
                return self.events.peek().map(|e| e.time);
            }
        }
    }

    pub fn cancel_hold(&mut self, process: ProcessId, id: EventId) {
        if self.pending_holds.get(&process) == Some(&id) {
            self.pending_holds.remove(&process);
            self.cancelled_events.insert(id);
        }
    }

    /// Drops all pending events without resuming their processes, returns the number of dropped events.
    pub fn discard_events(&mut self) -> usize {
        let mut discarded = 0;
        for event in self.events.drain() {
            if !self.cancelled_events.contains(&event.id) {
                event.promise.detach();
                discarded += 1;
            }
        }
        self.cancelled_events.clear();
        self.pending_holds.clear();
        discarded
    }

    pub fn pending_event_count(&self) -> usize {
        self.events.len() - self.cancelled_events.len()
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }
}
