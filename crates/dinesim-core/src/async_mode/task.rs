use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use crate::error::SimResult;
use crate::process::ProcessId;

type BoxedProcess = Pin<Box<dyn Future<Output = SimResult<()>>>>;

// Represents a simulation process spawned via Simulation::spawn_process or ProcessContext::spawn_process.
// Holds the process body until it completes. The executor removes finished tasks from its table,
// so a task is never polled after completion.
pub(crate) struct Task {
    pub id: ProcessId,
    pub name: String,
    body: RefCell<BoxedProcess>,
}

impl Task {
    pub fn new(id: ProcessId, name: String, body: impl Future<Output = SimResult<()>> + 'static) -> Self {
        Self {
            id,
            name,
            body: RefCell::new(Box::pin(body)),
        }
    }

    // Runs the process until its next suspension point.
    pub fn poll(&self, waker: &Waker) -> Poll<SimResult<()>> {
        let async_ctx = &mut Context::from_waker(waker);
        self.body.borrow_mut().as_mut().poll(async_ctx)
    }
}
