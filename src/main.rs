use std::process::ExitCode;

use clap::Parser;

use picraft::cli::{self, CliArgs};
use picraft::logger;

fn main() -> ExitCode {
    logger::init();
    let args = CliArgs::parse();

    // One cooperative thread: edits run to completion in order, and the
    // codec hops suspend onto the runtime's blocking pool.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: could not start the runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(cli::run(args))
}
