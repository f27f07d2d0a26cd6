use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Builder;
use log::error;

use dinesim_hall::{FileDirectiveSource, HallConfig, HallReport, HallSimulation};

/// Dining hall queueing simulation
#[derive(Parser, Debug)]
#[clap(long_about = None)]
struct Args {
    /// Path to YAML config, the built-in lunch-hour setup is used if omitted
    #[clap(long, short)]
    config: Option<String>,

    /// File polled for capacity directives `<counter_name> <new_server_count>`
    #[clap(long, short)]
    directives: Option<String>,

    /// Random seed, overrides the config value
    #[clap(long, short)]
    seed: Option<u64>,

    /// Simulation duration in seconds, overrides the config value
    #[clap(long = "duration", short = 't')]
    duration: Option<f64>,

    /// Print report as JSON
    #[clap(long)]
    json: bool,
}

fn print_report(config: &HallConfig, report: &HallReport) {
    println!("{}", "-".repeat(60));
    println!("Counters:");
    for counter in &config.counters {
        println!(
            "  - {}: service time {} s, probability {}, servers {}",
            counter.name, counter.service_time, counter.selection_probability, counter.server_count
        );
    }
    println!("{}", "-".repeat(60));
    println!("Results:");
    for (key, value) in report.to_key_values() {
        println!("  {:<32} {}", key, value);
    }
    println!("{}", "=".repeat(60));
}

fn main() -> ExitCode {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => HallConfig::from_file(Path::new(path)),
        None => Ok(HallConfig::default()),
    };
    let mut config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(duration) = args.duration {
        config.simulation_duration = duration;
    }

    let mut hall = match HallSimulation::new(config.clone()) {
        Ok(hall) => hall,
        Err(e) => {
            error!("invalid config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = &args.directives {
        hall.add_directive_source(Box::new(FileDirectiveSource::new(path)));
    }

    let report = match hall.run() {
        Ok(report) => report,
        Err(e) => {
            error!("simulation aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&config, &report);
    }
    ExitCode::SUCCESS
}
