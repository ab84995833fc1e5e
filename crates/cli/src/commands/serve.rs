//! Serve command handler.
//!
//! Starts the HTTP API server.

use super::make_llm_client;
use clap::Args;
use scholar_core::{config::AppConfig, AppResult};
use scholar_server::{run_server, ServerState};
use std::sync::Arc;

/// Run the HTTP API server
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Bind host (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config)
    #[arg(long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    /// Execute the serve command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate()?;

        let client = make_llm_client(config)?;
        let api_key = config.resolve_api_key(&config.provider)?;

        let host = self
            .host
            .clone()
            .unwrap_or_else(|| config.server.host.clone());
        let port = self.port.unwrap_or(config.server.port);

        let state = Arc::new(ServerState::new(config.clone(), client, api_key));

        run_server(state, &host, port).await
    }
}
