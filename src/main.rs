use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::debug;

use mirmap::command::Commands;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    debug!("Running {}", cli.command);

    let result = match cli.command {
        Commands::Collapse(mut cmd) => cmd.try_execute(),
        Commands::Parse(mut cmd) => cmd.try_execute(),
        Commands::Unmapped(mut cmd) => cmd.try_execute(),
        Commands::Count(mut cmd) => cmd.try_execute(),
        Commands::Summary(mut cmd) => cmd.try_execute(),
        Commands::Map(mut cmd) => cmd.try_execute(),
        Commands::Mismatch(mut cmd) => cmd.try_execute(),
        Commands::Viewer(mut cmd) => cmd.try_execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
