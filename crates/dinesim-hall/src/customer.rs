//! Customer process.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use dinesim_core::{log_debug, log_trace, log_warn, ProcessContext, ProcessId, SimResult};

use crate::facility::{CounterId, CustomerId, FacilityState};

/// Stage of a customer visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CustomerState {
    Arriving,
    Committing,
    Transiting,
    QueuedVisible,
    AwaitingResource,
    BeingServed,
    Departed,
    Balked,
}

impl CustomerState {
    /// Returns `true` if the customer is committed to a counter and has not departed yet.
    pub fn is_in_system(&self) -> bool {
        matches!(
            self,
            Self::Transiting | Self::QueuedVisible | Self::AwaitingResource | Self::BeingServed
        )
    }
}

/// Terminal result of a visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CustomerOutcome {
    Served,
    Balked,
}

/// Customer log entry, updated on every state change.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub process: ProcessId,
    pub counter: Option<CounterId>,
    pub arrival_time: f64,
    pub commit_time: Option<f64>,
    pub queue_entry_time: Option<f64>,
    pub service_start_time: Option<f64>,
    pub departure_time: Option<f64>,
    /// Time between the resource request and the grant.
    pub wait_time: Option<f64>,
    /// Number of extra draws caused by full counters.
    pub redraws: u32,
    pub state: CustomerState,
    pub history: Vec<(f64, CustomerState)>,
}

impl CustomerRecord {
    pub fn new(id: CustomerId, process: ProcessId, arrival_time: f64) -> Self {
        Self {
            id,
            process,
            counter: None,
            arrival_time,
            commit_time: None,
            queue_entry_time: None,
            service_start_time: None,
            departure_time: None,
            wait_time: None,
            redraws: 0,
            state: CustomerState::Arriving,
            history: vec![(arrival_time, CustomerState::Arriving)],
        }
    }

    pub fn transition(&mut self, state: CustomerState, time: f64) {
        self.state = state;
        self.history.push((time, state));
    }

    /// Returns the outcome of a finished visit.
    pub fn outcome(&self) -> Option<CustomerOutcome> {
        match self.state {
            CustomerState::Departed => Some(CustomerOutcome::Served),
            CustomerState::Balked => Some(CustomerOutcome::Balked),
            _ => None,
        }
    }
}

/// Transit durations of a committed customer.
#[derive(Clone, Copy, Debug)]
pub struct TransitTimes {
    pub entrance_to_queue: f64,
    pub queue_to_tail: f64,
}

/// Body of a customer process: admission, counter choice, transit, queueing, service.
///
/// The facility state is borrowed only between suspension points.
pub async fn visit(ctx: ProcessContext, facility: Rc<RefCell<FacilityState>>, transit: TransitTimes) -> SimResult<()> {
    let customer = facility.borrow_mut().register_arrival(ctx.id(), ctx.time());

    // admission and counter choice
    let counter = {
        let mut f = facility.borrow_mut();
        if f.is_full() {
            f.balk(customer, ctx.time());
            log_debug!(
                ctx,
                "hall is full ({}/{}), leaving",
                f.global_occupancy(),
                f.facility_capacity()
            );
            return Ok(());
        }
        debug_assert!(f.any_slack(), "facility has room but no counter has slack");
        if !f.drawable_slack() {
            f.balk(customer, ctx.time());
            log_warn!(ctx, "only counters with zero selection probability have room, leaving");
            return Ok(());
        }
        f.start_committing(customer, ctx.time());
        let mut counter = ctx.sample_from_distribution(f.weights());
        let mut redraws = 0;
        while !f.has_slack(counter) {
            log_trace!(ctx, "counter {} is full, choosing again", f.counter(counter).name());
            counter = ctx.sample_from_distribution(f.weights());
            redraws += 1;
        }
        f.commit(customer, counter, redraws, ctx.time());
        log_debug!(ctx, "heading to {}", f.counter(counter).name());
        counter
    };
    let (resource, queue, service_time) = {
        let f = facility.borrow();
        let c = f.counter(counter);
        (c.resource().clone(), c.queue().clone(), c.service_time())
    };

    ctx.hold(transit.entrance_to_queue).await?;
    ctx.hold(transit.queue_to_tail).await?;

    facility.borrow_mut().reach_queue(customer, counter, ctx.time());
    ctx.enter(&queue);

    facility.borrow_mut().await_resource(customer, ctx.time());
    let wait_time = ctx.request(&resource).await;

    ctx.leave(&queue)?;
    facility.borrow_mut().start_service(customer, wait_time, ctx.time());
    log_trace!(ctx, "served at {} after waiting {:.3}", resource.name(), wait_time);
    ctx.hold(service_time).await?;

    ctx.release(&resource)?;
    facility.borrow_mut().depart(customer, ctx.time());
    log_trace!(ctx, "departed");
    Ok(())
}
