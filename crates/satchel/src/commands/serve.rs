//! Serve command - runs the session server.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use satchel_server::Server;
use satchel_session::SessionManager;

use super::Context;
use crate::settings;

/// Arguments for the serve command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Mount the playground counter at /api/count
    #[arg(long)]
    pub counter: bool,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let loaded = super::load(args.config.as_deref(), ctx)?;
    let config = &loaded.config;

    let mut server_section = config.server();
    if let Some(port) = args.port {
        server_section.port = port;
    }
    if let Some(bind) = args.bind {
        server_section.bind = bind;
    }
    if args.counter {
        server_section.counter_route = true;
    }

    let session_section = config.session();
    let session_config = settings::session_config(&session_section)?;
    let storage = settings::storage_config(&session_section.storage)?;
    let server_config = settings::server_config(&server_section, &config.api())?;

    let sessions = SessionManager::from_config(session_config, &storage)?;
    let server = Server::new(sessions, server_config);

    info!(
        addr = %server.bind_address(),
        driver = storage.driver(),
        "Satchel ready"
    );
    server.run().await?;
    Ok(())
}
