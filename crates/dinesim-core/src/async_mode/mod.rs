//! Cooperative execution of simulation processes.
//!
//! Processes are plain `async` blocks polled by a single-threaded executor. A process runs until it awaits
//! a [`HoldFuture`] or a [`RequestFuture`], and is resumed when the event queue or the resource wakes it.

pub mod hold_future;
pub mod request_future;

pub(crate) mod executor;
pub(crate) mod task;
pub(crate) mod waker;

pub use hold_future::HoldFuture;
pub use request_future::RequestFuture;
