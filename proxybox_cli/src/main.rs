mod ui;

use clap::Parser;
use crate::ui::cli;
use proxybox_core::utils::logging::init_logging;

fn main() {
    let args = cli::Args::parse();
    init_logging(args.verbose);
    if let Err(e) = cli::run_cli(args) {
        eprintln!("proxybox error: {e:#}");
        std::process::exit(1);
    }
}
