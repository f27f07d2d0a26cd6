//! Arrival generator.

use std::cell::RefCell;
use std::rc::Rc;

use rand_distr::Exp;

use dinesim_core::{log_debug, log_info, ProcessContext, SimResult};

use crate::config::ArrivalPattern;
use crate::customer::{visit, TransitTimes};
use crate::error::ConfigError;
use crate::facility::FacilityState;

/// Source of inter-arrival delays.
pub enum ArrivalSchedule {
    Exponential(Exp<f64>),
    Fixed(f64),
    Times { times: Vec<f64>, next: usize },
}

impl ArrivalSchedule {
    pub fn new(pattern: &ArrivalPattern) -> Result<Self, ConfigError> {
        Ok(match pattern {
            ArrivalPattern::Exponential { mean } => {
                let dist = Exp::new(1. / mean).map_err(|e| ConfigError::InvalidParameter {
                    name: "arrivals.mean",
                    reason: e.to_string(),
                })?;
                Self::Exponential(dist)
            }
            ArrivalPattern::Fixed { interval } => Self::Fixed(*interval),
            ArrivalPattern::Times { times } => Self::Times {
                times: times.clone(),
                next: 0,
            },
        })
    }

    /// Returns the delay from `now` until the next arrival, or `None` if arrivals are over.
    pub fn next_delay(&mut self, ctx: &ProcessContext) -> Option<f64> {
        match self {
            Self::Exponential(dist) => Some(ctx.sample_from_distribution(&*dist)),
            Self::Fixed(interval) => Some(*interval),
            Self::Times { times, next } => {
                let t = *times.get(*next)?;
                *next += 1;
                Some((t - ctx.time()).max(0.))
            }
        }
    }
}

/// Body of the generator process.
///
/// Spawns a customer after each delay until the simulation time reaches `cutoff`.
/// The cutoff is checked before each delay, so the customer whose delay started before the cutoff still arrives.
pub async fn generate_arrivals(
    ctx: ProcessContext,
    facility: Rc<RefCell<FacilityState>>,
    mut schedule: ArrivalSchedule,
    transit: TransitTimes,
    cutoff: f64,
) -> SimResult<()> {
    let mut spawned = 0u64;
    loop {
        if ctx.time() >= cutoff {
            break;
        }
        let Some(delay) = schedule.next_delay(&ctx) else {
            break;
        };
        ctx.hold(delay).await?;
        let facility = facility.clone();
        ctx.spawn_process(format!("customer_{}", spawned), move |ctx| visit(ctx, facility, transit));
        log_debug!(ctx, "customer_{} arrived", spawned);
        spawned += 1;
    }
    log_info!(ctx, "generator stopped after {} arrivals", spawned);
    Ok(())
}
