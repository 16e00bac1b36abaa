use anyhow::{Context, Result};
use std::net::SocketAddr;

use crate::cli::commands::ServerCommand;
use crate::config::ServiceConfig;
use crate::server::{self, state::ServerState};

pub async fn handle_server(cmd: &ServerCommand, mut config: ServiceConfig) -> Result<()> {
    if cmd.lazy_image_model {
        config.models.preload_image_model = false;
    }

    let addr: SocketAddr = config
        .listen_addr()
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen_addr()))?;

    let state = ServerState::load(&config)
        .await
        .context("Failed to initialize server state")?;

    server::start_server(addr, state).await.context("Server error")?;

    Ok(())
}

pub fn handle_config(config: &ServiceConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
