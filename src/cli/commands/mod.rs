pub mod config;
pub mod server;

pub use config::ConfigCommand;
pub use server::ServerCommand;

use clap::Subcommand;

use crate::config::ConfigArgs;

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Vaidya model server
    Server(ServerCommand),
    /// Print the effective configuration as TOML
    Config(ConfigCommand),
}

impl Commands {
    pub fn config_args(&self) -> &ConfigArgs {
        match self {
            Commands::Server(cmd) => &cmd.config,
            Commands::Config(cmd) => &cmd.config,
        }
    }
}
