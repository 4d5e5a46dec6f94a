use std::process::ExitCode;

use clap::Parser;
use sn_cli::args::CliArgs;
use sn_cli::driver::run_compile;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    sn_cli::init_tracing(args.verbose);
    match run_compile(&args) {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(error) => {
            eprintln!("sn: {error:#}");
            ExitCode::FAILURE
        }
    }
}
