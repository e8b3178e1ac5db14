mod commands;
mod logging;
mod progress;

use std::process;

use clap::Parser;
use colored::*;
use commands::Cli;
use dotenv::dotenv;
use gdb_sweep_core::{AppConfig, Error, SweepReport};
use progress::CliReporter;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let mut config = match gdb_sweep_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    args.apply_overrides(&mut config);
    if args.print_config {
        println!("Configuration: {:?}", config);
    }

    match run_sweep(&args, &config) {
        Ok(report) => print_report(&report),
        Err(Error::Inaccessible(path)) => {
            error!("Cannot access geodatabase: {}", path);
            error!("Please verify the supplied path.");
        }
        Err(err @ Error::Database(_)) => error!("{}", err),
        Err(err) => error!("Unexpected error: {}", err),
    }

    Ok(())
}

fn run_sweep(args: &Cli, config: &AppConfig) -> Result<SweepReport, Error> {
    let reporter = CliReporter::new();
    gdb_sweep_core::sweep_geopackage(&args.path, config, &reporter)
}

fn print_report(report: &SweepReport) {
    println!();
    info!(
        "Datasets: {} processed, {} empty, {} deleted",
        format!("{}", report.datasets).cyan(),
        format!("{}", report.empty_datasets).yellow(),
        format!("{}", report.deleted_datasets).red(),
    );
    info!(
        "Feature classes checked: {}, tables checked: {}",
        format!("{}", report.feature_classes).cyan(),
        format!("{}", report.tables).cyan(),
    );
    info!(
        "Empty elements: {} found, {} deleted",
        format!("{}", report.empty_elements).yellow(),
        format!("{}", report.deleted_elements).red(),
    );
    if report.failures > 0 {
        info!(
            "{} elements could not be processed, see warnings above",
            format!("{}", report.failures).red(),
        );
    }
    if report.compacted {
        info!("Database compacted");
    }
    info!(
        "Finished in {}",
        format!("{:.2}s", report.duration.as_secs_f64()).green()
    );

    if report.deleted.is_empty() {
        info!("No empty elements found to delete.");
    } else {
        info!("Deleted elements:");
        for entry in &report.deleted {
            info!("- {}", entry);
        }
    }
}
