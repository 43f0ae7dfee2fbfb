//! revkv CLI: the `revkv` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use revkv_http::Command;

fn main() {
    let cli = Cli::parse();
    let config = support::load_config_or_exit(cli.config.as_deref());
    support::init_logging(&config.log_filter);

    match cli.command {
        Commands::Serve {
            bind,
            store,
            memory,
        } => commands::serve::run(&config, bind, store, memory),

        Commands::Set {
            name,
            value,
            store,
            json,
        } => commands::ops::run(&config, store, Command::Set { name, value }, json),

        Commands::Get { name, store, json } => {
            commands::ops::run(&config, store, Command::Get { name }, json)
        }

        Commands::Unset { name, store, json } => {
            commands::ops::run(&config, store, Command::Unset { name }, json)
        }

        Commands::NumEqualTo { value, store, json } => {
            commands::ops::run(&config, store, Command::NumEqualTo { value }, json)
        }

        Commands::Undo { store, json } => commands::ops::run(&config, store, Command::Undo, json),

        Commands::Redo { store, json } => commands::ops::run(&config, store, Command::Redo, json),

        Commands::End { store, json } => commands::ops::run(&config, store, Command::End, json),

        Commands::Log { name, store, json } => commands::log::run(&config, name, store, json),

        Commands::Check { store, json } => commands::check::run(&config, store, json),
    }
}
