use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use vai_installer::cli::Cli;
use vai_installer::commands;
use vai_installer::error::{InstallError, ParseError};
use vai_installer::logging::{self, Log, Logger};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_subscriber(cli.verbose);
    let log: Arc<dyn Log> = Arc::new(Logger::new());

    match commands::install::run(&cli, Arc::clone(&log)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(InstallError::Parse(ParseError::HelpRequested { usage, .. })) => {
            print_usage(&usage);
            ExitCode::from(2)
        }
        // The runner has already reported the failing stage.
        Err(e @ InstallError::Stage(_)) => ExitCode::from(e.exit_code()),
        Err(e) => {
            log.error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_usage(usage: &str) {
    print!("{usage}");
}
