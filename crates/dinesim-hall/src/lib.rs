#![doc = include_str!("../readme.md")]

pub mod config;
pub mod customer;
pub mod error;
pub mod facility;
pub mod generator;
pub mod reconfig;
pub mod routing;
pub mod simulation;
pub mod snapshot;
pub mod stats;

pub use config::{ArrivalPattern, CounterType, HallConfig, RawHallConfig};
pub use customer::{CustomerOutcome, CustomerRecord, CustomerState};
pub use error::{ConfigError, DirectiveError};
pub use facility::FacilityState;
pub use reconfig::{Directive, DirectiveSource, FileDirectiveSource, QueueDirectiveSource};
pub use routing::{choose_counter, CounterWeights};
pub use simulation::HallSimulation;
pub use snapshot::{HallSnapshot, Waypoint};
pub use stats::{CounterReport, HallReport};
