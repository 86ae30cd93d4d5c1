//! Sweep command - one eviction pass over the configured store.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use satchel_session::{SessionManager, StorageConfig};

use super::Context;
use crate::settings;

/// Arguments for the sweep command.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the sweep command.
pub async fn run(args: SweepArgs, ctx: &Context) -> Result<()> {
    let loaded = super::load(args.config.as_deref(), ctx)?;
    let session_section = loaded.config.session();
    let session_config = settings::session_config(&session_section)?;
    let storage = settings::storage_config(&session_section.storage)?;

    if storage == StorageConfig::Memory {
        println!("The memory driver keeps no sessions between runs; nothing to sweep.");
        return Ok(());
    }

    let sessions = SessionManager::from_config(session_config, &storage)?;
    let evicted = sessions.sweep().await?;
    println!(
        "Evicted {} session(s) from {} store under '{}'.",
        evicted,
        storage.driver(),
        sessions.store().prefix()
    );
    Ok(())
}
