//! Configuration and directive errors.

use std::io;

use thiserror::Error;

use dinesim_core::SimError;

/// Invalid or inconsistent hall configuration. Raised before the simulation clock starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No counter types are configured.
    #[error("counter set is empty")]
    Empty,
    /// Counter definition lacks a required field.
    #[error("counter `{counter}` is missing field `{field}`")]
    MissingField {
        /// Counter name, or its position in the list if the name is missing.
        counter: String,
        /// Name of the missing field.
        field: &'static str,
    },
    /// Two counters share a name.
    #[error("duplicate counter name `{0}`")]
    DuplicateName(String),
    /// Server count is zero or negative.
    #[error("counter `{counter}` has non-positive server count {server_count}")]
    NonPositiveServers {
        /// Counter name.
        counter: String,
        /// Configured server count.
        server_count: i64,
    },
    /// Service time is zero, negative or not a number.
    #[error("counter `{counter}` has non-positive service time {service_time}")]
    NonPositiveServiceTime {
        /// Counter name.
        counter: String,
        /// Configured service time.
        service_time: f64,
    },
    /// Selection probability is negative or not a number.
    #[error("counter `{counter}` has negative selection probability {probability}")]
    NegativeProbability {
        /// Counter name.
        counter: String,
        /// Configured probability.
        probability: f64,
    },
    /// Selection probabilities do not sum to 1.
    #[error("selection probabilities sum to {sum}, expected 1")]
    ProbabilitySum {
        /// Actual sum.
        sum: f64,
    },
    /// Scalar parameter is out of its domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// What is wrong with the value.
        reason: String,
    },
    /// Hall model could not be built in the simulation.
    #[error(transparent)]
    Simulation(#[from] SimError),
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    /// Config file is not valid YAML or has wrong field types.
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Rejected capacity reconfiguration directive. Reported and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectiveError {
    /// Line is not of the form `<counter_name> <new_server_count>`.
    #[error("malformed directive `{0}`, expected `<counter_name> <new_server_count>`")]
    Malformed(String),
    /// Counter name is not configured.
    #[error("unknown counter `{0}`")]
    UnknownCounter(String),
    /// Requested server count is zero or negative.
    #[error("non-positive server count {count} for counter `{counter}`")]
    NonPositiveCount {
        /// Counter name.
        counter: String,
        /// Requested server count.
        count: i64,
    },
    /// Resulting counter or hall capacity does not fit into `u32`.
    #[error("server count {count} for counter `{counter}` overflows the hall capacity")]
    CapacityOverflow {
        /// Counter name.
        counter: String,
        /// Requested server count.
        count: u32,
    },
    /// Capacity change was refused by the counter resources.
    #[error(transparent)]
    Rejected(#[from] SimError),
}
