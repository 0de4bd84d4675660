use clap::Parser;
use meanrev::cli::{Cli, run};
use meanrev::logging::init_tracing;

fn main() -> std::process::ExitCode {
    init_tracing();
    run(Cli::parse())
}
