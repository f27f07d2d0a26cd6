use std::cell::{Ref, RefCell};
use std::rc::Rc;

use dinesim_core::{log_info, ProcessContext, ProcessId, RunOutcome, SimResult, Simulation};

use crate::config::HallConfig;
use crate::customer::{CustomerRecord, TransitTimes};
use crate::error::ConfigError;
use crate::facility::{Counter, FacilityState};
use crate::generator::{generate_arrivals, ArrivalSchedule};
use crate::reconfig::{listen_directives, DirectiveSource, DirectiveSources, QueueDirectiveSource};
use crate::routing::CounterWeights;
use crate::snapshot::HallSnapshot;
use crate::stats::HallReport;

/// Dining hall model on top of a process simulation.
///
/// Creates one resource and one queue per counter type and starts the arrival generator
/// and the directive listener processes.
pub struct HallSimulation {
    sim: Simulation,
    ctx: ProcessContext,
    config: HallConfig,
    facility: Rc<RefCell<FacilityState>>,
    directives: QueueDirectiveSource,
    sources: DirectiveSources,
    generator: ProcessId,
    listener: ProcessId,
}

impl HallSimulation {
    /// Validates the config and builds the hall. Nothing runs until [`run`](Self::run) or a step method is called.
    pub fn new(config: HallConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut sim = Simulation::new(config.seed);
        let ctx = sim.create_context("hall");

        let mut counters = Vec::with_capacity(config.counters.len());
        for kind in &config.counters {
            let resource = sim.create_resource(&kind.name, kind.server_count)?;
            let queue = sim.create_queue(
                format!("{}_queue", kind.name),
                config.queue_capacity_per_server * kind.server_count,
            )?;
            counters.push(Counter::new(kind.clone(), resource, queue));
        }
        let probabilities: Vec<f64> = config.counters.iter().map(|c| c.selection_probability).collect();
        let weights = CounterWeights::new(&probabilities)?;
        let facility = Rc::new(RefCell::new(FacilityState::new(
            counters,
            weights,
            config.queue_capacity_per_server,
        )));

        let transit = TransitTimes {
            entrance_to_queue: config.entrance_to_queue_time,
            queue_to_tail: config.queue_to_tail_time,
        };
        let schedule = ArrivalSchedule::new(&config.arrival_pattern())?;
        let cutoff = config.arrival_cutoff();
        let facility_ = facility.clone();
        let generator = sim.spawn_process("generator", move |ctx| {
            generate_arrivals(ctx, facility_, schedule, transit, cutoff)
        });

        let directives = QueueDirectiveSource::new();
        let in_memory: Box<dyn DirectiveSource> = Box::new(directives.clone());
        let sources: DirectiveSources = Rc::new(RefCell::new(vec![in_memory]));
        let facility_ = facility.clone();
        let sources_ = sources.clone();
        let period = config.directive_poll_period;
        let end_time = config.simulation_duration;
        let listener = sim.spawn_process("directives", move |ctx| {
            listen_directives(ctx, facility_, sources_, period, end_time)
        });

        log_info!(
            ctx,
            "hall with {} counters and {} servers, capacity {}",
            config.counters.len(),
            facility.borrow().total_servers(),
            facility.borrow().facility_capacity()
        );
        Ok(Self {
            sim,
            ctx,
            config,
            facility,
            directives,
            sources,
            generator,
            listener,
        })
    }

    /// Adds an external source of capacity directives, polled along with the in-memory one.
    pub fn add_directive_source(&mut self, source: Box<dyn DirectiveSource>) {
        self.sources.borrow_mut().push(source);
    }

    /// Handle to the in-memory directive queue.
    pub fn directives(&self) -> QueueDirectiveSource {
        self.directives.clone()
    }

    /// Runs the simulation until the configured duration and returns the final report.
    ///
    /// Customers still in the hall at the end are left as they are and counted as in system.
    pub fn run(&mut self) -> SimResult<HallReport> {
        let outcome = self.sim.run(self.config.simulation_duration)?;
        if outcome == RunOutcome::Exhausted {
            log_info!(self.ctx, "no events left before the end of simulation");
        }
        let report = self.report();
        log_info!(
            self.ctx,
            "finished: {} arrivals, {} balked, {} served",
            report.arrivals,
            report.balked,
            report.served
        );
        Ok(report)
    }

    /// Processes events up to `time` keeping later ones, see [`Simulation::step_until_time`].
    pub fn step_until_time(&mut self, time: f64) -> SimResult<bool> {
        self.sim.step_until_time(time)
    }

    pub fn time(&self) -> f64 {
        self.sim.time()
    }

    pub fn report(&self) -> HallReport {
        HallReport::collect(&self.facility.borrow(), self.time())
    }

    pub fn snapshot(&self) -> HallSnapshot {
        HallSnapshot::take(
            &self.facility.borrow(),
            self.time(),
            self.config.entrance_to_queue_time,
            self.config.queue_to_tail_time,
        )
    }

    pub fn facility(&self) -> Ref<'_, FacilityState> {
        self.facility.borrow()
    }

    pub fn customers(&self) -> Vec<CustomerRecord> {
        self.facility.borrow().customers().to_vec()
    }

    pub fn config(&self) -> &HallConfig {
        &self.config
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn generator_id(&self) -> ProcessId {
        self.generator
    }

    pub fn listener_id(&self) -> ProcessId {
        self.listener
    }
}
