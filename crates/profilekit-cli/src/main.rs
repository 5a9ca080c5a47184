use clap::Parser;

mod args;
mod commands;
mod logging;

use args::{Cli, Command};

async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        // Logs into its own run directory, so it installs logging itself
        Command::Profile(args) => commands::profile::run(args, cli.verbose).await,
        Command::Tables(args) => {
            logging::init(cli.verbose, None)?;
            commands::tables::run(args).await
        }
        Command::Summary(args) => {
            logging::init(cli.verbose, None)?;
            commands::summary::run(args)
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(err) = dispatch(&cli).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
