//! Secret - project-bound key management and secret file encryption.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use secret::cli::output;
use secret::cli::{execute, Cli};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("SECRET_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("secret=debug")
        } else {
            EnvFilter::new("secret=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .init();

    if let Err(e) = execute(cli.command) {
        output::error(&e.to_string());
        if let Some(hint) = e.hint() {
            output::hint(&hint);
        }
        std::process::exit(1);
    }
}
