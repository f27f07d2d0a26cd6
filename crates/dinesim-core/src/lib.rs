#![warn(missing_docs)]
#![doc = include_str!("../readme.md")]

pub mod async_mode;
pub mod context;
pub mod error;
pub mod event;
pub mod log;
pub mod monitor;
pub mod process;
pub mod queue;
pub mod resource;
pub mod simulation;
mod state;

#[doc(hidden)]
pub use ::log as __log;
pub use colored;
pub use context::ProcessContext;
pub use error::{SimError, SimResult};
pub use event::{Event, EventId};
pub use monitor::{SampleMetric, TimeWeighted};
pub use process::ProcessId;
pub use queue::Queue;
pub use resource::Resource;
pub use simulation::{RunOutcome, Simulation};
pub use state::EPSILON;
