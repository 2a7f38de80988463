//! Mouse rebinder daemon entry point.
//!
//! Wires together the settings storage, the tap controller, and the Quartz
//! event-tap backend, then parks until a shutdown signal arrives.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML settings, defaults on first run
//!  └─ TapController::new()   -- owns the tap lifecycle
//!  └─ SettingsService::new() -- pushes the persisted mapping into the controller
//!  └─ ctrl_c().await         -- park; the tap thread does the work
//!  └─ configure(disabled)    -- tear the tap down before exit
//! ```

use tracing::info;
use tracing_subscriber::EnvFilter;

use rebinder_daemon::infrastructure::storage::config::{config_file_path, load_config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_file_path()?;
    let config = load_config(&config_path)?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.daemon.log_level.clone())),
        )
        .init();

    info!(config = %config_path.display(), "mouse rebinder daemon starting");

    run(config, config_path).await
}

#[cfg(target_os = "macos")]
async fn run(
    config: rebinder_daemon::infrastructure::storage::config::AppConfig,
    config_path: std::path::PathBuf,
) -> anyhow::Result<()> {
    use std::sync::Arc;

    use rebinder_core::MappingConfig;
    use rebinder_daemon::application::settings::SettingsService;
    use rebinder_daemon::application::tap_controller::TapController;
    use rebinder_daemon::infrastructure::event_tap::macos::{
        request_accessibility_access, QuartzKeySynthesizer, QuartzTapPlatform,
    };
    use rebinder_daemon::infrastructure::storage::config::ConfigFileStore;
    use tracing::warn;

    // Surface the Accessibility dialog once at startup.  The daemon keeps
    // running either way; without the permission no tap is installed and
    // every button event reaches applications untouched.
    if !request_accessibility_access() {
        warn!("accessibility permission not granted; remapping is inactive until it is");
    }

    let controller = Arc::new(TapController::new(
        Arc::new(QuartzTapPlatform::new()),
        Arc::new(QuartzKeySynthesizer::new()),
    ));

    let store = ConfigFileStore::new(config_path, config.daemon.clone());
    // Construction pushes the persisted mapping, installing the tap when the
    // settings call for one.
    let _settings = SettingsService::new(
        config.remap,
        Box::new(store),
        Arc::clone(&controller) as Arc<dyn rebinder_daemon::application::settings::RemapControl>,
    );

    info!(active = controller.is_active(), "daemon ready, press Ctrl-C to exit");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // Tear the tap down so the run-loop thread exits before the process does.
    controller.configure(MappingConfig::disabled());

    info!("mouse rebinder daemon stopped");
    Ok(())
}

#[cfg(not(target_os = "macos"))]
async fn run(
    _config: rebinder_daemon::infrastructure::storage::config::AppConfig,
    _config_path: std::path::PathBuf,
) -> anyhow::Result<()> {
    anyhow::bail!("this daemon requires the macOS Quartz event services");
}
