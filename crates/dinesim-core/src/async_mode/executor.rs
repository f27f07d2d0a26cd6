use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::task::Poll;

use super::task::Task;
use super::waker::{process_waker, ReadyQueue};
use crate::error::SimResult;
use crate::process::ProcessId;

type TaskTable = Rc<RefCell<HashMap<ProcessId, Rc<Task>>>>;

// Result of polling a single ready process.
pub(crate) enum TaskPoll {
    // Process suspended again.
    Suspended,
    // Process body returned.
    Finished {
        id: ProcessId,
        name: String,
        result: SimResult<()>,
    },
    // Woken process has already finished.
    Stale,
}

// Registers new tasks in the executor. Cloned into the simulation state so that processes can spawn other processes.
#[derive(Clone)]
pub(crate) struct Spawner {
    tasks: TaskTable,
    ready: ReadyQueue,
}

impl Spawner {
    // Stores the process body and schedules its first poll.
    pub fn spawn(&self, id: ProcessId, name: &str, body: impl Future<Output = SimResult<()>> + 'static) {
        let task = Rc::new(Task::new(id, name.to_owned(), body));
        self.tasks.borrow_mut().insert(id, task);
        self.ready.push(id);
    }
}

// Polls processes to advance their state.
// Processes are scheduled for polling by wakers which push process ids into the ready queue.
pub(crate) struct Executor {
    tasks: TaskTable,
    ready: ReadyQueue,
}

impl Executor {
    pub fn new() -> Self {
        Self {
            tasks: Rc::new(RefCell::new(HashMap::new())),
            ready: ReadyQueue::default(),
        }
    }

    pub fn spawner(&self) -> Spawner {
        Spawner {
            tasks: self.tasks.clone(),
            ready: self.ready.clone(),
        }
    }

    // Polls one ready process, if any.
    pub fn process_task(&self) -> Option<TaskPoll> {
        let id = self.ready.pop()?;
        // The table borrow must be released before polling since the process may spawn new tasks.
        let task = self.tasks.borrow().get(&id).cloned();
        let Some(task) = task else {
            return Some(TaskPoll::Stale);
        };
        let waker = process_waker(id, self.ready.clone());
        match task.poll(&waker) {
            Poll::Pending => Some(TaskPoll::Suspended),
            Poll::Ready(result) => {
                self.tasks.borrow_mut().remove(&id);
                Some(TaskPoll::Finished {
                    id: task.id,
                    name: task.name.clone(),
                    result,
                })
            }
        }
    }

    pub fn has_ready_tasks(&self) -> bool {
        self.ready.len() > 0
    }

    pub fn active_count(&self) -> usize {
        self.tasks.borrow().len()
    }
}
