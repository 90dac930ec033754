use anyhow::Context;
use cart_crunch::cli::{Cli, Commands};
use cart_crunch::pipeline::Runner;
use cart_crunch::{config, logging};
use clap::Parser;
use dotenv::dotenv;
use std::process;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = config::load_configuration().context("Error loading configuration")?;

    let args = Cli::parse();

    match args.command {
        Some(Commands::Run) | None => {
            let runner = Runner::new(config);
            match runner.run() {
                Ok(summary) => {
                    info!(
                        "Analyzed {} orders and {} line items (load {:.2}s, clean {:.2}s, aggregate {:.2}s)",
                        summary.orders_analyzed,
                        summary.line_items_analyzed,
                        summary.load_duration.as_secs_f64(),
                        summary.clean_duration.as_secs_f64(),
                        summary.aggregate_duration.as_secs_f64(),
                    );
                }
                Err(err) => {
                    error!("Error: {}", err);
                    process::exit(1);
                }
            }
        }
        Some(Commands::Check) => {
            let runner = Runner::new(config);
            if let Err(err) = runner.check() {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
    }

    Ok(())
}
