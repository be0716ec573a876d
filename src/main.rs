use std::process::ExitCode;

use blog_index::{run, Args};
use clap::Parser;
use log::error;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err.chain());
            ExitCode::FAILURE
        }
    }
}
