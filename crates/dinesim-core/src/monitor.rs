//! Statistics collected by resources and queues.

use serde::Serialize;

/// Collection of observed values, e.g. waiting times of granted requests.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SampleMetric {
    count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl SampleMetric {
    /// Adds a sample.
    pub fn add(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.min = Some(self.min.map_or(x, |m| m.min(x)));
        self.max = Some(self.max.map_or(x, |m| m.max(x)));
    }

    /// Number of samples.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of samples.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Mean of samples, 0 if there are none.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.
        } else {
            self.sum / self.count as f64
        }
    }

    /// Smallest sample.
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Largest sample.
    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

/// Piecewise-constant level integrated over simulation time.
///
/// Used for time-weighted means such as resource occupancy or queue length,
/// where each value counts proportionally to how long it was held.
#[derive(Clone, Debug, Serialize)]
pub struct TimeWeighted {
    start: f64,
    last_update: f64,
    level: f64,
    integral: f64,
}

impl TimeWeighted {
    /// Starts tracking at `time` with the given initial level.
    pub fn new(time: f64, level: f64) -> Self {
        Self {
            start: time,
            last_update: time,
            level,
            integral: 0.,
        }
    }

    /// Sets a new level starting from `time`.
    pub fn update(&mut self, time: f64, level: f64) {
        if time > self.last_update {
            self.integral += self.level * (time - self.last_update);
            self.last_update = time;
        }
        self.level = level;
    }

    /// Current level.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Integral of the level from the start up to `time`.
    pub fn integral(&self, time: f64) -> f64 {
        self.integral + self.level * (time - self.last_update).max(0.)
    }

    /// Time-weighted mean from the start up to `time`.
    ///
    /// Returns the current level if no time has passed since the start.
    pub fn mean(&self, time: f64) -> f64 {
        let elapsed = time - self.start;
        if elapsed > 0. {
            self.integral(time) / elapsed
        } else {
            self.level
        }
    }
}
