use clap::Parser;
use livefeed::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
