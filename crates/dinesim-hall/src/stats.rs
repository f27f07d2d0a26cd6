//! Statistics aggregation.

use indexmap::IndexMap;
use serde::Serialize;

use crate::facility::FacilityState;

/// Per-counter figures read from the counter resource and queue at query time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CounterReport {
    pub name: String,
    pub capacity: u32,
    pub queue_capacity: u32,
    pub queue_length: usize,
    pub claimed: u32,
    pub in_flight: u32,
    /// Claimed fraction of capacity at query time.
    pub utilization: f64,
    /// Claimed fraction of capacity averaged over the whole run.
    pub mean_occupancy: f64,
    pub mean_queue_length: f64,
    /// Mean time between request and grant of the counter servers.
    pub mean_wait_time: f64,
    pub served: u64,
}

/// Final or intermediate hall statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HallReport {
    pub time: f64,
    pub counters: Vec<CounterReport>,
    pub arrivals: u64,
    pub balked: u64,
    pub served: u64,
    /// Customers committed to a counter and not departed yet.
    pub customers_in_system: u64,
    /// Mean wait time over counters weighted by their served counts.
    pub overall_mean_wait_time: f64,
    pub directives_applied: u64,
    pub directives_rejected: u64,
}

impl HallReport {
    /// Reads the current figures. Does not change any simulation state.
    pub fn collect(facility: &FacilityState, time: f64) -> Self {
        let counters: Vec<CounterReport> = facility
            .counters()
            .enumerate()
            .map(|(id, counter)| {
                let resource = counter.resource();
                let queue = counter.queue();
                CounterReport {
                    name: counter.name().to_string(),
                    capacity: resource.capacity(),
                    queue_capacity: facility.counter_capacity(id),
                    queue_length: queue.length(),
                    claimed: resource.claimed_count(),
                    in_flight: counter.in_flight(),
                    utilization: resource.occupancy_sample(),
                    mean_occupancy: resource.mean_occupancy(),
                    mean_queue_length: queue.mean_length(),
                    mean_wait_time: resource.mean_wait_time(),
                    served: resource.served_count(),
                }
            })
            .collect();

        let served: u64 = counters.iter().map(|c| c.served).sum();
        let weighted_wait: f64 = counters.iter().map(|c| c.mean_wait_time * c.served as f64).sum();
        let overall_mean_wait_time = if served > 0 {
            weighted_wait / served as f64
        } else {
            0.
        };
        let customers_in_system = counters
            .iter()
            .map(|c| (c.queue_length + c.claimed as usize + c.in_flight as usize) as u64)
            .sum();

        Self {
            time,
            counters,
            arrivals: facility.arrivals(),
            balked: facility.balked(),
            served,
            customers_in_system,
            overall_mean_wait_time,
            directives_applied: facility.directives_applied(),
            directives_rejected: facility.directives_rejected(),
        }
    }

    pub fn counter(&self, name: &str) -> Option<&CounterReport> {
        self.counters.iter().find(|c| c.name == name)
    }

    /// Flattens the report into ordered `key -> value` pairs for console or log output.
    ///
    /// Counter figures are keyed as `<counter>.<figure>`.
    pub fn to_key_values(&self) -> IndexMap<String, String> {
        let mut kv = IndexMap::new();
        kv.insert("time".to_string(), format!("{:.3}", self.time));
        for c in &self.counters {
            let mut put = |key: &str, value: String| kv.insert(format!("{}.{}", c.name, key), value);
            put("capacity", c.capacity.to_string());
            put("queue_capacity", c.queue_capacity.to_string());
            put("queue_length", c.queue_length.to_string());
            put("claimed", c.claimed.to_string());
            put("in_flight", c.in_flight.to_string());
            put("utilization", format!("{:.2}%", c.utilization * 100.));
            put("mean_occupancy", format!("{:.2}%", c.mean_occupancy * 100.));
            put("mean_queue_length", format!("{:.3}", c.mean_queue_length));
            put("mean_wait_time", format!("{:.2}", c.mean_wait_time));
            put("served", c.served.to_string());
        }
        kv.insert("arrivals".to_string(), self.arrivals.to_string());
        kv.insert("balked".to_string(), self.balked.to_string());
        kv.insert("served".to_string(), self.served.to_string());
        kv.insert("customers_in_system".to_string(), self.customers_in_system.to_string());
        kv.insert(
            "overall_mean_wait_time".to_string(),
            format!("{:.2}", self.overall_mean_wait_time),
        );
        kv.insert("directives_applied".to_string(), self.directives_applied.to_string());
        kv.insert("directives_rejected".to_string(), self.directives_rejected.to_string());
        kv
    }
}
