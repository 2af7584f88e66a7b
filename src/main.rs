use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use snowfall::settings::DEFAULT_SETTINGS_FILE;
use snowfall::{DisplayMode, NullWindowProvider, Preset, SettingsStore, SettingsWatcher, SnowApp};

/// Transparent GPU snowfall over every display.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Settings file; edits are picked up while running.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Start from a preset (light, comfort, blizzard, custom).
    #[arg(long)]
    preset: Option<Preset>,

    /// Let snow fall straight through the focused window.
    #[arg(long)]
    no_window_interaction: bool,

    /// Only cover this display; repeat for several.
    #[arg(long = "display", value_name = "NAME")]
    displays: Vec<String>,

    /// Don't watch the settings file for changes.
    #[arg(long)]
    no_watch: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("snowfall=info".parse()?))
        .init();

    let args = Args::parse();
    info!("Snowfall {} starting", env!("CARGO_PKG_VERSION"));

    let store = SettingsStore::open(&args.config);
    let overridden =
        args.preset.is_some() || args.no_window_interaction || !args.displays.is_empty();
    store.update(|settings| {
        if let Some(preset) = args.preset {
            settings.apply_preset(preset);
        }
        if args.no_window_interaction {
            settings.window_interaction = false;
        }
        if !args.displays.is_empty() {
            settings.display_mode = DisplayMode::Selected;
            settings.selected_monitors = args.displays.iter().cloned().collect();
        }
    });
    // Persist so a later reload of the file keeps them.
    if overridden {
        if let Err(e) = store.save() {
            warn!("command-line settings not saved: {}", e);
        }
    }

    // No native window enumeration yet: snow never melts on windows.
    let provider = Arc::new(NullWindowProvider);
    let mut app = SnowApp::new(store.clone(), provider);

    if !args.no_watch {
        match SettingsWatcher::new(store.path()) {
            Ok(watcher) => app = app.with_watcher(watcher),
            Err(e) => warn!("live settings reload disabled: {}", e),
        }
    }

    app.run()?;
    info!("Snowfall stopped");
    Ok(())
}
