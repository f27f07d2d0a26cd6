//! Hall configuration.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tolerance of the selection probability sum.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Definition of a counter type: a named service station with identical servers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CounterType {
    pub name: String,
    /// Fixed service duration of a single customer.
    pub service_time: f64,
    /// Probability that an arriving customer picks this counter.
    pub selection_probability: f64,
    pub server_count: u32,
}

impl CounterType {
    pub fn new(name: &str, service_time: f64, selection_probability: f64, server_count: u32) -> Self {
        Self {
            name: name.to_string(),
            service_time,
            selection_probability,
            server_count,
        }
    }
}

/// Distribution of customer inter-arrival times.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArrivalPattern {
    /// Exponentially distributed intervals with the given mean.
    Exponential { mean: f64 },
    /// Constant interval, the first customer arrives after one interval.
    Fixed { interval: f64 },
    /// Explicit arrival instants in non-decreasing order.
    Times { times: Vec<f64> },
}

// Raw config ----------------------------------------------------------------------------------------------------------

/// Counter definition as read from YAML. Fields are optional to report missing ones by name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawCounterConfig {
    pub name: Option<String>,
    pub service_time: Option<f64>,
    pub selection_probability: Option<f64>,
    pub server_count: Option<i64>,
}

/// YAML-serializable config
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawHallConfig {
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_simulation_duration")]
    pub simulation_duration: f64,
    #[serde(default = "default_generator_stop_time")]
    pub generator_stop_time: f64,
    #[serde(default = "default_inter_arrival_time")]
    pub inter_arrival_time: f64,
    #[serde(default = "default_queue_capacity_per_server")]
    pub queue_capacity_per_server: u32,
    #[serde(default = "default_entrance_to_queue_time")]
    pub entrance_to_queue_time: f64,
    #[serde(default = "default_queue_to_tail_time")]
    pub queue_to_tail_time: f64,
    #[serde(default = "default_directive_poll_period")]
    pub directive_poll_period: f64,
    #[serde(default)]
    pub arrivals: Option<ArrivalPattern>,
    #[serde(default)]
    pub counters: Vec<RawCounterConfig>,
}

fn default_simulation_duration() -> f64 {
    240.
}

fn default_generator_stop_time() -> f64 {
    120.
}

fn default_inter_arrival_time() -> f64 {
    5.
}

fn default_queue_capacity_per_server() -> u32 {
    8
}

fn default_entrance_to_queue_time() -> f64 {
    27.
}

fn default_queue_to_tail_time() -> f64 {
    3.
}

fn default_directive_poll_period() -> f64 {
    1.
}

// Validated config ----------------------------------------------------------------------------------------------------

/// Validated hall configuration.
///
/// Implements [`Default`] with the lunch-hour setup of three counter types, so that one can create
/// the default config and change only the needed fields. [`HallSimulation`](crate::HallSimulation)
/// validates the config again before starting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HallConfig {
    /// Seed of the simulation random number generator.
    pub seed: u64,
    /// Run length in seconds.
    pub simulation_duration: f64,
    /// Arrivals stop at `simulation_duration - generator_stop_time`.
    pub generator_stop_time: f64,
    /// Mean of exponential inter-arrival times, used unless `arrivals` is set.
    pub inter_arrival_time: f64,
    /// Queue slots per server of a counter.
    pub queue_capacity_per_server: u32,
    /// Walk from the entrance to the queue tail.
    pub entrance_to_queue_time: f64,
    /// Approach from the queue tail to the queue slot.
    pub queue_to_tail_time: f64,
    /// Period of polling directive sources.
    pub directive_poll_period: f64,
    /// Explicit arrival pattern.
    pub arrivals: Option<ArrivalPattern>,
    pub counters: Vec<CounterType>,
}

impl Default for HallConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            simulation_duration: default_simulation_duration(),
            generator_stop_time: default_generator_stop_time(),
            inter_arrival_time: default_inter_arrival_time(),
            queue_capacity_per_server: default_queue_capacity_per_server(),
            entrance_to_queue_time: default_entrance_to_queue_time(),
            queue_to_tail_time: default_queue_to_tail_time(),
            directive_poll_period: default_directive_poll_period(),
            arrivals: None,
            counters: vec![
                CounterType::new("snack", 120., 0.45, 3),
                CounterType::new("dumplings", 40., 0.37, 2),
                CounterType::new("noodles", 40., 0.18, 1),
            ],
        }
    }
}

impl HallConfig {
    /// Creates and validates config from the raw YAML representation.
    pub fn from_raw(raw: RawHallConfig) -> Result<Self, ConfigError> {
        let mut counters = Vec::with_capacity(raw.counters.len());
        for (i, counter) in raw.counters.into_iter().enumerate() {
            counters.push(counter_from_raw(i, counter)?);
        }
        let config = Self {
            seed: raw.seed,
            simulation_duration: raw.simulation_duration,
            generator_stop_time: raw.generator_stop_time,
            inter_arrival_time: raw.inter_arrival_time,
            queue_capacity_per_server: raw.queue_capacity_per_server,
            entrance_to_queue_time: raw.entrance_to_queue_time,
            queue_to_tail_time: raw.queue_to_tail_time,
            directive_poll_period: raw.directive_poll_period,
            arrivals: raw.arrivals,
            counters,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Self::from_raw(serde_yaml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let f = File::open(path)?;
        Self::from_raw(serde_yaml::from_reader(f)?)
    }

    /// Time after which no new customers arrive.
    pub fn arrival_cutoff(&self) -> f64 {
        self.simulation_duration - self.generator_stop_time
    }

    /// Arrival pattern in effect: `arrivals` if set, otherwise exponential with mean `inter_arrival_time`.
    pub fn arrival_pattern(&self) -> ArrivalPattern {
        self.arrivals.clone().unwrap_or(ArrivalPattern::Exponential {
            mean: self.inter_arrival_time,
        })
    }

    /// Checks counter definitions and scalar parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.counters.is_empty() {
            return Err(ConfigError::Empty);
        }
        let mut names = HashSet::new();
        let mut sum = 0.;
        for counter in &self.counters {
            if !names.insert(counter.name.as_str()) {
                return Err(ConfigError::DuplicateName(counter.name.clone()));
            }
            if counter.server_count == 0 {
                return Err(ConfigError::NonPositiveServers {
                    counter: counter.name.clone(),
                    server_count: 0,
                });
            }
            if !(counter.service_time > 0.) {
                return Err(ConfigError::NonPositiveServiceTime {
                    counter: counter.name.clone(),
                    service_time: counter.service_time,
                });
            }
            if !(counter.selection_probability >= 0.) {
                return Err(ConfigError::NegativeProbability {
                    counter: counter.name.clone(),
                    probability: counter.selection_probability,
                });
            }
            sum += counter.selection_probability;
        }
        if (sum - 1.).abs() > PROBABILITY_TOLERANCE {
            return Err(ConfigError::ProbabilitySum { sum });
        }

        positive("simulation_duration", self.simulation_duration)?;
        non_negative("generator_stop_time", self.generator_stop_time)?;
        positive("inter_arrival_time", self.inter_arrival_time)?;
        if self.queue_capacity_per_server == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "queue_capacity_per_server",
                reason: "must be at least 1".to_string(),
            });
        }
        self.check_capacities()?;
        non_negative("entrance_to_queue_time", self.entrance_to_queue_time)?;
        non_negative("queue_to_tail_time", self.queue_to_tail_time)?;
        positive("directive_poll_period", self.directive_poll_period)?;

        match &self.arrivals {
            Some(ArrivalPattern::Exponential { mean }) => positive("arrivals.mean", *mean),
            Some(ArrivalPattern::Fixed { interval }) => positive("arrivals.interval", *interval),
            Some(ArrivalPattern::Times { times }) => {
                for t in times {
                    non_negative("arrivals.times", *t)?;
                }
                if times.windows(2).any(|w| w[1] < w[0]) {
                    return Err(ConfigError::InvalidParameter {
                        name: "arrivals.times",
                        reason: "must be sorted".to_string(),
                    });
                }
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl HallConfig {
    /// Checks that per-counter and hall-wide queue capacities fit into `u32`.
    fn check_capacities(&self) -> Result<(), ConfigError> {
        let qcps = self.queue_capacity_per_server;
        let mut total_servers = 0u32;
        for counter in &self.counters {
            let overflow = || ConfigError::InvalidParameter {
                name: "server_count",
                reason: format!("capacity of counter `{}` overflows", counter.name),
            };
            qcps.checked_mul(counter.server_count).ok_or_else(overflow)?;
            total_servers = total_servers.checked_add(counter.server_count).ok_or_else(overflow)?;
        }
        qcps.checked_mul(total_servers)
            .map(|_| ())
            .ok_or_else(|| ConfigError::InvalidParameter {
                name: "queue_capacity_per_server",
                reason: format!("hall capacity for {} servers overflows", total_servers),
            })
    }
}

fn counter_from_raw(index: usize, raw: RawCounterConfig) -> Result<CounterType, ConfigError> {
    let name = raw.name.ok_or(ConfigError::MissingField {
        counter: format!("#{}", index),
        field: "name",
    })?;
    let missing = |field| ConfigError::MissingField {
        counter: name.clone(),
        field,
    };
    let service_time = raw.service_time.ok_or_else(|| missing("service_time"))?;
    let selection_probability = raw
        .selection_probability
        .ok_or_else(|| missing("selection_probability"))?;
    let server_count = raw.server_count.ok_or_else(|| missing("server_count"))?;
    if server_count <= 0 || server_count > u32::MAX as i64 {
        return Err(ConfigError::NonPositiveServers {
            counter: name,
            server_count,
        });
    }
    Ok(CounterType {
        name,
        service_time,
        selection_probability,
        server_count: server_count as u32,
    })
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0. && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be positive, got {}", value),
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0. && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be non-negative, got {}", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
seed: 7
simulation_duration: 100
queue_capacity_per_server: 2
arrivals: { type: fixed, interval: 2.5 }
counters:
  - { name: soup, service_time: 30, selection_probability: 0.6, server_count: 2 }
  - { name: salad, service_time: 15, selection_probability: 0.4, server_count: 1 }
"#;

    #[test]
    fn test_default_config_is_valid() {
        let config = HallConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.arrival_cutoff(), 120.);
        assert_eq!(config.arrival_pattern(), ArrivalPattern::Exponential { mean: 5. });
    }

    #[test]
    fn test_parse_yaml() {
        let config = HallConfig::from_yaml_str(CONFIG).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.simulation_duration, 100.);
        // omitted fields take defaults
        assert_eq!(config.generator_stop_time, 120.);
        assert_eq!(config.entrance_to_queue_time, 27.);
        assert_eq!(config.queue_capacity_per_server, 2);
        assert_eq!(config.arrival_pattern(), ArrivalPattern::Fixed { interval: 2.5 });
        assert_eq!(
            config.counters,
            vec![CounterType::new("soup", 30., 0.6, 2), CounterType::new("salad", 15., 0.4, 1)]
        );
    }

    #[test]
    fn test_missing_field() {
        let yaml = r#"
counters:
  - { name: soup, service_time: 30, server_count: 2 }
"#;
        match HallConfig::from_yaml_str(yaml) {
            Err(ConfigError::MissingField { counter, field }) => {
                assert_eq!(counter, "soup");
                assert_eq!(field, "selection_probability");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        let yaml = r#"
counters:
  - { service_time: 30, selection_probability: 1, server_count: 2 }
"#;
        assert!(matches!(
            HallConfig::from_yaml_str(yaml),
            Err(ConfigError::MissingField { field: "name", .. })
        ));
    }

    #[test]
    fn test_probability_sum() {
        let mut config = HallConfig::default();
        config.counters[0].selection_probability = 0.4;
        assert!(matches!(config.validate(), Err(ConfigError::ProbabilitySum { .. })));

        // within tolerance
        config.counters[0].selection_probability = 0.45 + 1e-8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_counter_domains() {
        let mut config = HallConfig::default();
        config.counters[1].server_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NonPositiveServers { .. })));

        let mut config = HallConfig::default();
        config.counters[1].service_time = 0.;
        assert!(matches!(config.validate(), Err(ConfigError::NonPositiveServiceTime { .. })));

        let mut config = HallConfig::default();
        config.counters[1].selection_probability = -0.1;
        config.counters[2].selection_probability = 0.65;
        assert!(matches!(config.validate(), Err(ConfigError::NegativeProbability { .. })));

        let mut config = HallConfig::default();
        config.counters[2].name = "snack".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateName(name)) if name == "snack"));

        let mut config = HallConfig::default();
        config.counters.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Empty)));

        let yaml = r#"
counters:
  - { name: soup, service_time: 30, selection_probability: 1, server_count: -2 }
"#;
        assert!(matches!(
            HallConfig::from_yaml_str(yaml),
            Err(ConfigError::NonPositiveServers { server_count: -2, .. })
        ));
    }

    #[test]
    fn test_scalar_parameters() {
        let mut config = HallConfig::default();
        config.queue_capacity_per_server = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter {
                name: "queue_capacity_per_server",
                ..
            })
        ));

        let mut config = HallConfig::default();
        config.arrivals = Some(ArrivalPattern::Times { times: vec![3., 1.] });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "arrivals.times", .. })
        ));

        let mut config = HallConfig::default();
        config.inter_arrival_time = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_capacity_overflow() {
        let mut config = HallConfig::default();
        config.counters[0].server_count = 1 << 30;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "server_count", .. })
        ));

        let mut config = HallConfig::default();
        config.queue_capacity_per_server = 1;
        for counter in config.counters.iter_mut() {
            counter.server_count = u32::MAX / 2;
        }
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "server_count", .. })
        ));

        let mut config = HallConfig::default();
        config.queue_capacity_per_server = 2;
        config.counters[0].server_count = u32::MAX / 3;
        config.counters[1].server_count = u32::MAX / 3;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter {
                name: "queue_capacity_per_server",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = HallConfig::from_file(Path::new("/nonexistent/hall.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
