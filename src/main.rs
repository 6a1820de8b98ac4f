use std::error::Error;

use clap::Parser;
use treefetch::{
    cli::{args::CliArgs, command_handlers},
    config::TreefetchConfig,
};

fn run() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    let config = TreefetchConfig::load()?;

    command_handlers::do_fetch(args, config)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
