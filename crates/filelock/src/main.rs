mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use context::Context;
use env_logger::Env;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let result = Context::new(cli.config.as_deref(), cli.verbose).and_then(|mut ctx| {
        match &cli.command {
            Commands::Try { target, json } => commands::try_lock::run(&mut ctx, target, *json),
            Commands::Hold {
                target,
                timeout,
                hold_ms,
            } => commands::hold::run(&mut ctx, target, *timeout, *hold_ms),
            Commands::Run {
                target,
                timeout,
                command,
            } => commands::run::run(&mut ctx, target, *timeout, command),
            Commands::Check { target, json } => commands::check::run(&mut ctx, target, *json),
        }
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
