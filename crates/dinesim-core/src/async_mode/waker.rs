// Wakers that resume processes by pushing their ids to the executor's ready queue.
//
// The waker never touches the task itself, so there are no reference cycles between
// tasks and the wait states (hold events, resource wait lines) they are parked in.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::Waker;

use futures::task::{waker, ArcWake};

use crate::process::ProcessId;

// FIFO of processes ready to be polled.
// Wakers must be Send + Sync, hence the mutex, but it is only ever locked from the simulation thread.
#[derive(Clone, Default)]
pub(crate) struct ReadyQueue {
    ids: Arc<Mutex<VecDeque<ProcessId>>>,
}

impl ReadyQueue {
    pub fn push(&self, id: ProcessId) {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).push_back(id);
    }

    pub fn pop(&self) -> Option<ProcessId> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

struct ProcessWaker {
    process: ProcessId,
    ready: ReadyQueue,
}

impl ArcWake for ProcessWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.ready.push(arc_self.process);
    }
}

pub(crate) fn process_waker(process: ProcessId, ready: ReadyQueue) -> Waker {
    waker(Arc::new(ProcessWaker { process, ready }))
}
