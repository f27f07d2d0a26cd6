//! Timed waits.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::{SimError, SimResult};
use crate::event::EventId;
use crate::process::ProcessId;
use crate::state::SimulationState;

// Hold future ---------------------------------------------------------------------------------------------------------

/// Future that represents a process suspended for a fixed amount of simulation time.
///
/// Resolves to `Err(SimError::InvalidDelay)` immediately if the requested duration is negative,
/// and to `Err(SimError::HoldPending)` if the process already waits for another hold.
/// Dropping an incomplete future cancels the scheduled wake-up.
pub struct HoldFuture {
    process: ProcessId,
    event_id: Option<EventId>,
    state: Rc<RefCell<HoldState>>,
    sim_state: Rc<RefCell<SimulationState>>,
}

impl HoldFuture {
    pub(crate) fn new(process: ProcessId, duration: f64, sim_state: Rc<RefCell<SimulationState>>) -> Self {
        let state = Rc::new(RefCell::new(HoldState::default()));
        let promise = HoldPromise { state: state.clone() };
        let scheduled = sim_state.borrow_mut().schedule(process, duration, promise);
        let event_id = match scheduled {
            Ok(id) => Some(id),
            Err(e) => {
                state.borrow_mut().fail(e);
                None
            }
        };
        Self {
            process,
            event_id,
            state,
            sim_state,
        }
    }

    /// Returns the id of the scheduled wake-up event, `None` if the hold was rejected.
    pub fn event_id(&self) -> Option<EventId> {
        self.event_id
    }
}

impl Future for HoldFuture {
    type Output = SimResult<()>;

    fn poll(self: Pin<&mut Self>, async_ctx: &mut Context) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        if !state.completed {
            state.waker = Some(async_ctx.waker().clone());
            return Poll::Pending;
        }
        match state.error.take() {
            Some(e) => Poll::Ready(Err(e)),
            None => Poll::Ready(Ok(())),
        }
    }
}

impl Drop for HoldFuture {
    fn drop(&mut self) {
        let state = self.state.borrow();
        if state.completed || state.detached {
            return;
        }
        if let (Some(id), Ok(mut sim_state)) = (self.event_id, self.sim_state.try_borrow_mut()) {
            sim_state.cancel_hold(self.process, id);
        }
    }
}

// Hold promise --------------------------------------------------------------------------------------------------------

/// Completion side of a hold, stored inside the scheduled [`Event`](crate::event::Event).
pub(crate) struct HoldPromise {
    state: Rc<RefCell<HoldState>>,
}

impl HoldPromise {
    /// Marks the hold as completed and wakes the waiting process.
    pub fn complete(&self) {
        let waker = {
            let mut state = self.state.borrow_mut();
            state.completed = true;
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Called when the event is discarded at the end of a run, the process is never resumed.
    pub fn detach(&self) {
        let mut state = self.state.borrow_mut();
        state.detached = true;
        state.waker = None;
    }
}

#[derive(Default)]
struct HoldState {
    completed: bool,
    detached: bool,
    error: Option<SimError>,
    waker: Option<Waker>,
}

impl HoldState {
    fn fail(&mut self, error: SimError) {
        self.completed = true;
        self.error = Some(error);
    }
}
