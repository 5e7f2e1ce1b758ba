//! Fire CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fire_cli::cli::{Cli, Commands};
use fire_cli::commands::{GenerateCommand, KeyCommand, ParseCommand, RenderCommand};
use fire_cli::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Generate(args) => {
            GenerateCommand::new(&args).execute(&mut stdout)?;
        }
        Commands::Genkey => KeyCommand::Generate.execute(&mut io::empty(), &mut stdout)?,
        Commands::Pubkey => KeyCommand::Public.execute(&mut io::stdin().lock(), &mut stdout)?,
        Commands::Genpsk => KeyCommand::Preshared.execute(&mut io::empty(), &mut stdout)?,
        Commands::Render { file } => RenderCommand::new(file).execute(&mut stdout)?,
        Commands::Parse { file } => ParseCommand::new(file).execute(&mut stdout)?,
    }

    Ok(())
}
