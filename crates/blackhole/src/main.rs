mod cli;
mod headless;
mod paths;
mod run;
mod settings;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match &cli.command {
        Some(Command::Headless(args)) => run::run_headless(&cli.run, args),
        Some(Command::Config(args)) => run::print_config(&cli.run, args),
        None => run::run_window(&cli.run),
    }
}
