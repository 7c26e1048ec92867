use anyhow::{Context, Result};
use tracing::{info, warn};

use support_hub::activity_log;
use support_hub::config::Config;
use support_hub::server::{self, AppState, SettingsStore};
use support_hub::SupportHub;

fn main() -> Result<()> {
    if let Err(e) = activity_log::init_logging() {
        activity_log::init_console_logging();
        warn!("File logging unavailable, using console only: {}", e);
    }

    info!("Support hub starting...");

    let config = Config::load_or_default();
    let addr = config.socket_addr()?;

    let config_path = match Config::config_path() {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Settings will not be saved: {}", e);
            None
        }
    };

    // Animation assets are fetched once here, before the runtime starts
    let hub = SupportHub::from_config(&config)?;
    let state = AppState::new(hub, SettingsStore::new(config.clone(), config_path));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    // The hub owns blocking HTTP clients; its last handle must drop outside the runtime
    let _hub = state.hub.clone();
    runtime.block_on(server::serve(state, addr, config.max_material_bytes))?;

    Ok(())
}
