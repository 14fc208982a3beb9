use std::process::ExitCode;

use clap::Parser;

use finopsguard::cli::{self, Cli, Command, EXIT_INTERRUPTED};
use finopsguard::config::{self, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::from_env(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(1);
        }
    };
    config::init_tracing(&settings.logging);

    // The server installs its own signal handler for graceful shutdown;
    // one-shot commands map an interrupt to exit code 130.
    if matches!(cli.command, Command::Serve) {
        return finish(cli::run(cli, settings).await);
    }

    tokio::select! {
        result = cli::run(cli, settings) => finish(result),
        _ = tokio::signal::ctrl_c() => ExitCode::from(EXIT_INTERRUPTED),
    }
}

fn finish(result: anyhow::Result<ExitCode>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}
