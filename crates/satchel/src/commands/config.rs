//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;
use crate::settings;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show {
        /// Path to config file (overrides default discovery)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show which config files are loaded and their precedence
    Which,

    /// Show configuration file path
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./satchel.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show { config } => cmd_show(config, ctx),
        ConfigCommand::Which => cmd_which(),
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::Init { local } => cmd_init(local),
    }
}

fn cmd_show(explicit: Option<PathBuf>, ctx: &Context) -> Result<()> {
    let loaded = super::load(explicit.as_deref(), ctx)?;
    let config = &loaded.config;

    println!("# Satchel Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let session_section = config.session();
    let server = settings::server_config(&config.server(), &config.api())?;
    let session = settings::session_config(&session_section)?;
    let storage = settings::storage_config(&session_section.storage)?;

    println!("Server:");
    println!("  bind: {}", server.bind_address);
    println!("  request logging: {}", server.request_logging);
    println!("  counter route: {}", server.counter_route);
    println!();

    println!("Session:");
    match session.expiry_secs() {
        Some(secs) => println!("  expiry: {}s", secs),
        None => println!("  expiry: never"),
    }
    println!("  id length: {}", session.id_length);
    println!("  store: {} ({}:*)", storage.driver(), session.store_prefix);
    println!("  ip pinning: {:?}", session.ip_pinning);
    println!(
        "  rolling: {}, save uninitialized: {}, resave: {}",
        session.rolling, session.save_uninitialized, session.resave
    );
    if let Some(interval) = session.sweep_interval {
        println!("  sweep every: {}s", interval.as_secs());
    }
    println!();

    println!("API:");
    if server.api.enabled {
        println!("  base path: {}", server.api.base_path);
        if server.api.methods.is_empty() {
            println!("  methods: all");
        } else {
            println!("  methods: {:?}", server.api.methods);
        }
    } else {
        println!("  disabled");
    }
    println!();

    if ctx.verbose {
        println!("---\nRaw config:\n");
        println!("{}", config.to_toml()?);
    }

    Ok(())
}

fn cmd_which() -> Result<()> {
    let loaded = satchel_config::load_config(None)?;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'satchel config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

fn cmd_path() -> Result<()> {
    if let Some(path) = satchel_config::xdg_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("satchel.toml")
    } else {
        let dir = satchel_config::xdg_config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        std::fs::create_dir_all(&dir)?;
        dir.join("config.toml")
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    std::fs::write(&path, TEMPLATE)?;
    println!("✓ Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  satchel config show    # verify configuration");
    println!("  satchel serve          # start the server");

    Ok(())
}

const TEMPLATE: &str = r#"# Satchel Configuration

[server]
port = 3000
bind = "127.0.0.1"
request_logging = true
# counter_route = true          # playground counter at GET /api/count

[session]
expiry_in_seconds = 600         # or false for sessions that never expire
id_length = 64
store_prefix = "sessions"
cookie_same_site = "lax"        # lax | strict | none
cookie_secure = true
cookie_http_only = true
# domain = ".example.com"
ip_pinning = false              # true pins to the peer address
# ip_pinning = { header_name = "X-Forwarded-For" }
rolling = false
save_uninitialized = true
resave = true
# sweep_interval_seconds = 300

[session.storage]
driver = "memory"               # memory | fs | http
# base = "./.data/sessions"     # fs
# url = "http://127.0.0.1:8787" # http
# timeout_seconds = 10          # http

[api]
enabled = true
methods = []                    # get | patch | post | delete; empty = all
base_path = "/api/session"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_config::SatchelConfig;

    #[test]
    fn test_template_parses_and_maps() {
        let config = SatchelConfig::from_toml(TEMPLATE).unwrap();
        let session = config.session();
        assert!(settings::session_config(&session).is_ok());
        assert!(settings::storage_config(&session.storage).is_ok());
        assert!(settings::server_config(&config.server(), &config.api()).is_ok());
    }
}
