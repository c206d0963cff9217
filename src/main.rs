//! # Waysnitch - Wayland input event viewer
//!
//! Opens a single toplevel window and shows every pointer, keyboard and
//! touch event the compositor delivers to it.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use waysnitch::ClientConfig;

#[derive(Parser)]
#[command(name = "waysnitch")]
#[command(about = "A minimal Wayland client that logs input events on screen")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/waysnitch/waysnitch.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Window title
    #[arg(long)]
    title: Option<String>,

    /// Initial buffer width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Initial buffer height in pixels
    #[arg(long)]
    height: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration before logging so `general.debug` can raise the level
    let loaded = ClientConfig::load(&cli.config);
    let debug = cli.debug || loaded.as_ref().map_or(false, |c| c.general.debug);

    // Initialize logging
    let filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    info!("🚀 Starting Waysnitch");
    info!("📄 Version: {}", waysnitch::VERSION);

    let mut config = match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            info!("📝 Using default configuration");
            ClientConfig::default()
        }
    };

    // Override config with CLI flags
    apply_overrides(&cli, &mut config);
    if let Err(e) = config.validate() {
        error!("❌ Invalid command line override: {}", e);
        std::process::exit(2);
    }

    if let Err(e) = waysnitch::wayland::run(&config) {
        error!("❌ {}", e);
        std::process::exit(1);
    }

    info!("👋 Waysnitch exited cleanly");
    Ok(())
}

fn apply_overrides(cli: &Cli, config: &mut ClientConfig) {
    if cli.debug {
        config.general.debug = true;
    }
    if let Some(title) = &cli.title {
        config.window.title = title.clone();
    }
    if let Some(width) = cli.width {
        config.window.default_width = width;
    }
    if let Some(height) = cli.height {
        config.window.default_height = height;
    }
}
