//! CLI command handlers.

pub mod config;
pub mod serve;
pub mod sweep;

use std::path::Path;

use anyhow::Result;
use satchel_config::LoadedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Verbose output enabled.
    pub verbose: bool,
}

/// Load `explicit` if given, otherwise discover and merge the config layers.
///
/// Warnings go to stderr; with `verbose` the loaded sources are listed too.
pub fn load(explicit: Option<&Path>, ctx: &Context) -> Result<LoadedConfig> {
    let loaded = match explicit {
        Some(path) => LoadedConfig::from_file(path)?,
        None => satchel_config::load_config(None)?,
    };

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    if ctx.verbose {
        let sources = loaded.loaded_from();
        if sources.is_empty() {
            eprintln!("No config files found, using defaults + CLI args");
        } else {
            for source in sources {
                eprintln!("Loaded config: {}", source.display());
            }
        }
    }

    Ok(loaded)
}
