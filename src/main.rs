// Headless binary: parse the command line, install the session logger and
// hand over to the batch pipeline.

use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use rasterkit::{cli, logger};

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    logger::init(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info });

    cli::run(args)
}
