//! Waiting for resource grants.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::process::ProcessId;
use crate::resource::Resource;

/// Future returned by [`Resource::request`](crate::resource::Resource::request).
///
/// Resolves to the time spent in the wait line once the resource is granted to the process.
/// Dropping the future before the grant removes the request from the wait line.
pub struct RequestFuture {
    resource: Rc<Resource>,
    process: ProcessId,
    grant: Rc<RefCell<GrantState>>,
}

impl RequestFuture {
    pub(crate) fn new(resource: Rc<Resource>, process: ProcessId, grant: Rc<RefCell<GrantState>>) -> Self {
        Self {
            resource,
            process,
            grant,
        }
    }

    /// Returns `true` if the resource is already granted.
    pub fn is_granted(&self) -> bool {
        self.grant.borrow().granted
    }
}

impl Future for RequestFuture {
    type Output = f64;

    fn poll(self: Pin<&mut Self>, async_ctx: &mut Context) -> Poll<Self::Output> {
        let mut grant = self.grant.borrow_mut();
        if grant.granted {
            Poll::Ready(grant.wait_time)
        } else {
            grant.waker = Some(async_ctx.waker().clone());
            Poll::Pending
        }
    }
}

impl Drop for RequestFuture {
    fn drop(&mut self) {
        if !self.grant.borrow().granted {
            self.resource.cancel_request(self.process, &self.grant);
        }
    }
}

// State shared between the future and the resource wait line ---------------------------------------------------------

#[derive(Default)]
pub(crate) struct GrantState {
    granted: bool,
    wait_time: f64,
    waker: Option<Waker>,
}

impl GrantState {
    pub fn granted(wait_time: f64) -> Self {
        Self {
            granted: true,
            wait_time,
            waker: None,
        }
    }

    pub fn complete(&mut self, wait_time: f64) {
        assert!(!self.granted, "internal error: resource is granted twice for the same request");
        self.granted = true;
        self.wait_time = wait_time;
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}
