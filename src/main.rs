use clap::Parser;
use std::process::ExitCode;
use stepwise::cli::commands::{exit_status, EXIT_INTERRUPTED};
use stepwise::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();
    let verbosity = cli.verbosity();

    // Initialize logging with verbosity-aware level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| verbosity.to_log_level().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run(args) => stepwise::cli::commands::run(args),
        Commands::Debug(args) => stepwise::cli::commands::debug(args, config),
        Commands::Disasm(args) => stepwise::cli::commands::disasm(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let status = exit_status(&e);
            if status == EXIT_INTERRUPTED {
                eprintln!("{}", e);
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::from(status)
        }
    }
}
