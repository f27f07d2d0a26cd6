//! Shared state of the dining hall: counters, admission counters and the customer log.

use std::rc::Rc;

use indexmap::IndexMap;

use dinesim_core::{ProcessId, Queue, Resource};

use crate::config::CounterType;
use crate::customer::{CustomerRecord, CustomerState};
use crate::error::DirectiveError;
use crate::reconfig::Directive;
use crate::routing::CounterWeights;

/// Index of a counter, equal to its position in the config.
pub type CounterId = usize;

/// Customer number, assigned in order of arrival.
pub type CustomerId = usize;

/// Counter type together with its servers and the visible queue in front of them.
pub struct Counter {
    kind: CounterType,
    resource: Rc<Resource>,
    queue: Rc<Queue>,
    in_flight: u32,
}

impl Counter {
    pub fn new(kind: CounterType, resource: Rc<Resource>, queue: Rc<Queue>) -> Self {
        Self {
            kind,
            resource,
            queue,
            in_flight: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.kind.name
    }

    pub fn kind(&self) -> &CounterType {
        &self.kind
    }

    pub fn service_time(&self) -> f64 {
        self.kind.service_time
    }

    pub fn server_count(&self) -> u32 {
        self.kind.server_count
    }

    pub fn resource(&self) -> &Rc<Resource> {
        &self.resource
    }

    pub fn queue(&self) -> &Rc<Queue> {
        &self.queue
    }

    /// Customers committed to this counter who have not entered its queue yet.
    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }
}

/// Admission state shared by all hall processes.
///
/// The global occupancy counts customers from commitment until service start,
/// i.e. it always equals the sum of queue lengths and in-flight reservations over all counters.
/// Facility capacity is the sum of per-counter capacities, so a facility with room always has a counter with room.
pub struct FacilityState {
    counters: Vec<Counter>,
    by_name: IndexMap<String, CounterId>,
    weights: CounterWeights,
    queue_capacity_per_server: u32,
    total_servers: u32,
    global_occupancy: u32,
    customers: Vec<CustomerRecord>,
    balked: u64,
    directives_applied: u64,
    directives_rejected: u64,
}

impl FacilityState {
    pub fn new(counters: Vec<Counter>, weights: CounterWeights, queue_capacity_per_server: u32) -> Self {
        let total_servers = counters.iter().map(|c| c.server_count()).sum();
        let by_name = counters
            .iter()
            .enumerate()
            .map(|(id, c)| (c.name().to_string(), id))
            .collect();
        Self {
            counters,
            by_name,
            weights,
            queue_capacity_per_server,
            total_servers,
            global_occupancy: 0,
            customers: Vec::new(),
            balked: 0,
            directives_applied: 0,
            directives_rejected: 0,
        }
    }

    // Counters --------------------------------------------------------------------------------------------------------

    pub fn counter(&self, id: CounterId) -> &Counter {
        &self.counters[id]
    }

    pub fn counter_by_name(&self, name: &str) -> Option<&Counter> {
        self.by_name.get(name).map(|id| &self.counters[*id])
    }

    pub fn counters(&self) -> impl Iterator<Item = &Counter> {
        self.counters.iter()
    }

    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }

    pub fn weights(&self) -> &CounterWeights {
        &self.weights
    }

    // Admission -------------------------------------------------------------------------------------------------------

    pub fn queue_capacity_per_server(&self) -> u32 {
        self.queue_capacity_per_server
    }

    pub fn total_servers(&self) -> u32 {
        self.total_servers
    }

    /// Facility-wide admission cap.
    pub fn facility_capacity(&self) -> u32 {
        self.queue_capacity_per_server * self.total_servers
    }

    pub fn counter_capacity(&self, id: CounterId) -> u32 {
        self.queue_capacity_per_server * self.counters[id].server_count()
    }

    pub fn global_occupancy(&self) -> u32 {
        self.global_occupancy
    }

    pub fn is_full(&self) -> bool {
        self.global_occupancy >= self.facility_capacity()
    }

    /// Returns `true` if queued and in-flight customers of the counter are below its capacity.
    pub fn has_slack(&self, id: CounterId) -> bool {
        let counter = &self.counters[id];
        (counter.queue.length() as u32 + counter.in_flight) < self.counter_capacity(id)
    }

    /// Returns `true` if some counter has slack.
    pub fn any_slack(&self) -> bool {
        (0..self.counters.len()).any(|id| self.has_slack(id))
    }

    /// Returns `true` if some counter with positive selection probability has slack.
    pub fn drawable_slack(&self) -> bool {
        (0..self.counters.len()).any(|id| self.weights.is_drawable(id) && self.has_slack(id))
    }

    // Customer lifecycle ----------------------------------------------------------------------------------------------

    /// Registers a new arrival and returns its number.
    pub fn register_arrival(&mut self, process: ProcessId, time: f64) -> CustomerId {
        let id = self.customers.len();
        self.customers.push(CustomerRecord::new(id, process, time));
        id
    }

    pub fn balk(&mut self, customer: CustomerId, time: f64) {
        self.balked += 1;
        self.customers[customer].transition(CustomerState::Balked, time);
    }

    pub fn start_committing(&mut self, customer: CustomerId, time: f64) {
        self.customers[customer].transition(CustomerState::Committing, time);
    }

    /// Reserves a place at the counter for a customer who leaves for its queue.
    pub fn commit(&mut self, customer: CustomerId, counter: CounterId, redraws: u32, time: f64) {
        self.global_occupancy += 1;
        self.counters[counter].in_flight += 1;
        let record = &mut self.customers[customer];
        record.counter = Some(counter);
        record.redraws = redraws;
        record.commit_time = Some(time);
        record.transition(CustomerState::Transiting, time);
    }

    /// Turns the in-flight reservation into queue membership, the caller enters the queue.
    pub fn reach_queue(&mut self, customer: CustomerId, counter: CounterId, time: f64) {
        self.counters[counter].in_flight -= 1;
        let record = &mut self.customers[customer];
        record.queue_entry_time = Some(time);
        record.transition(CustomerState::QueuedVisible, time);
    }

    pub fn await_resource(&mut self, customer: CustomerId, time: f64) {
        self.customers[customer].transition(CustomerState::AwaitingResource, time);
    }

    /// Called once the customer has left the queue for a granted server.
    pub fn start_service(&mut self, customer: CustomerId, wait_time: f64, time: f64) {
        self.global_occupancy -= 1;
        let record = &mut self.customers[customer];
        record.wait_time = Some(wait_time);
        record.service_start_time = Some(time);
        record.transition(CustomerState::BeingServed, time);
    }

    pub fn depart(&mut self, customer: CustomerId, time: f64) {
        let record = &mut self.customers[customer];
        record.departure_time = Some(time);
        record.transition(CustomerState::Departed, time);
    }

    pub fn customer(&self, id: CustomerId) -> &CustomerRecord {
        &self.customers[id]
    }

    pub fn customers(&self) -> &[CustomerRecord] {
        &self.customers
    }

    pub fn arrivals(&self) -> u64 {
        self.customers.len() as u64
    }

    pub fn balked(&self) -> u64 {
        self.balked
    }

    // Reconfiguration -------------------------------------------------------------------------------------------------

    /// Changes the number of servers of a counter along with its queue capacity and the facility total.
    ///
    /// Current holders of the counter keep being served, see [`Resource::set_capacity`].
    pub fn apply_directive(&mut self, directive: &Directive) -> Result<(), DirectiveError> {
        let result = self.try_apply_directive(directive);
        match result {
            Ok(()) => self.directives_applied += 1,
            Err(_) => self.directives_rejected += 1,
        }
        result
    }

    fn try_apply_directive(&mut self, directive: &Directive) -> Result<(), DirectiveError> {
        let id = *self
            .by_name
            .get(&directive.counter)
            .ok_or_else(|| DirectiveError::UnknownCounter(directive.counter.clone()))?;
        let count = directive.server_count;
        if count == 0 {
            return Err(DirectiveError::NonPositiveCount {
                counter: directive.counter.clone(),
                count: 0,
            });
        }
        // all capacities are checked before anything is changed
        let qcps = self.queue_capacity_per_server;
        let overflow = || DirectiveError::CapacityOverflow {
            counter: directive.counter.clone(),
            count,
        };
        let queue_capacity = qcps.checked_mul(count).ok_or_else(overflow)?;
        let total_servers = (self.total_servers - self.counters[id].server_count())
            .checked_add(count)
            .ok_or_else(overflow)?;
        qcps.checked_mul(total_servers).ok_or_else(overflow)?;

        let counter = &mut self.counters[id];
        counter.resource.set_capacity(count)?;
        counter.queue.set_capacity(queue_capacity)?;
        counter.kind.server_count = count;
        self.total_servers = total_servers;
        Ok(())
    }

    /// Records a directive which could not be parsed.
    pub fn reject_directive(&mut self) {
        self.directives_rejected += 1;
    }

    pub fn directives_applied(&self) -> u64 {
        self.directives_applied
    }

    pub fn directives_rejected(&self) -> u64 {
        self.directives_rejected
    }
}
