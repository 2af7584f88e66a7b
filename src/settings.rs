//! User settings, presets and the JSON settings file.
//!
//! [`Settings`] is a plain value. The overlay reads it through a
//! [`SettingsStore`], taking one [`snapshot`](SettingsStore::snapshot) per frame,
//! and a [`SettingsWatcher`] reports when the file on disk changed so the store
//! can [`reload`](SettingsStore::reload).
//!
//! The file is camelCase JSON; any missing key takes its default:
//!
//! ```json
//! {
//!   "currentPreset": "custom",
//!   "maxSnowflakes": 3000,
//!   "snowflakeSpeedRange": { "min": 40.0, "max": 200.0 },
//!   "windowInteraction": true
//! }
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SettingsError;

/// Settings file used when none is given on the command line.
pub const DEFAULT_SETTINGS_FILE: &str = "snowfall.json";

/// Smallest particle capacity a surface allocates.
pub const MIN_CAPACITY: u32 = 100;

/// Largest particle capacity a surface allocates.
pub const MAX_CAPACITY: u32 = 100_000;

/// Slowest melt the simulation runs, in opacity per second. Anything lower
/// would leave landed flakes on a window for good.
pub const MIN_MELT_RATE: f32 = 0.1;

/// Named parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Light,
    #[default]
    Comfort,
    Blizzard,
    /// Hand-tuned values; applying it changes nothing.
    Custom,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Light, Preset::Comfort, Preset::Blizzard, Preset::Custom];

    /// Overwrite the preset-controlled fields of `settings`.
    pub fn apply(self, settings: &mut Settings) {
        let (count, speed, size, wind) = match self {
            Preset::Light => (800, (12.0, 90.0), (2.0, 12.0), 0.5),
            Preset::Comfort => (2000, (30.0, 180.0), (3.0, 15.0), 1.0),
            Preset::Blizzard => (6000, (120.0, 480.0), (2.0, 20.0), 4.0),
            Preset::Custom => return,
        };
        settings.max_snowflakes = count;
        settings.snowflake_speed_range = ValueRange::new(speed.0, speed.1);
        settings.snowflake_size_range = ValueRange::new(size.0, size.1);
        settings.wind_strength = wind;
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::Light => "light",
            Preset::Comfort => "comfort",
            Preset::Blizzard => "blizzard",
            Preset::Custom => "custom",
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown preset '{}' (expected light, comfort, blizzard or custom)", s))
    }
}

/// Which displays get an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    All,
    /// Only displays named in [`Settings::selected_monitors`].
    Selected,
}

/// Closed `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Ordered and non-negative.
    pub fn sanitized(self) -> Self {
        let a = self.min.max(0.0);
        let b = self.max.max(0.0);
        Self::new(a.min(b), a.max(b))
    }
}

/// Everything the user can tune.
///
/// Speeds are in pixels per second, sizes in pixels, melting speed in opacity
/// per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub current_preset: Preset,
    pub is_paused: bool,
    pub display_mode: DisplayMode,
    pub selected_monitors: BTreeSet<String>,
    /// Hide the snow while the focused window covers a whole display.
    pub pause_in_fullscreen: bool,
    pub snowflake_size_range: ValueRange,
    pub max_snowflakes: i64,
    pub snowflake_speed_range: ValueRange,
    pub wind_strength: f32,
    pub melting_speed: f32,
    pub window_interaction: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_preset(Preset::Comfort)
    }
}

impl Settings {
    /// Default settings with `preset` applied.
    pub fn from_preset(preset: Preset) -> Self {
        let mut settings = Self {
            current_preset: preset,
            is_paused: false,
            display_mode: DisplayMode::All,
            selected_monitors: BTreeSet::new(),
            pause_in_fullscreen: true,
            snowflake_size_range: ValueRange::new(3.0, 15.0),
            max_snowflakes: 2000,
            snowflake_speed_range: ValueRange::new(30.0, 180.0),
            wind_strength: 1.0,
            melting_speed: 3.0,
            window_interaction: true,
        };
        preset.apply(&mut settings);
        settings
    }

    /// Switch to `preset` and take its values.
    pub fn apply_preset(&mut self, preset: Preset) {
        self.current_preset = preset;
        preset.apply(self);
    }

    /// Melting speed as the simulation uses it, at least [`MIN_MELT_RATE`].
    pub fn melt_rate(&self) -> f32 {
        self.melting_speed.max(MIN_MELT_RATE)
    }

    /// Particle buffer capacity, clamped to `[MIN_CAPACITY, MAX_CAPACITY]`.
    pub fn particle_capacity(&self) -> u32 {
        self.max_snowflakes
            .clamp(MIN_CAPACITY as i64, MAX_CAPACITY as i64) as u32
    }

    /// Whether the display called `name` should get an overlay.
    ///
    /// In [`DisplayMode::Selected`] only named displays qualify, so an empty
    /// selection shows nothing.
    pub fn shows_display(&self, name: &str) -> bool {
        match self.display_mode {
            DisplayMode::All => true,
            DisplayMode::Selected => self.selected_monitors.contains(name),
        }
    }

    /// True when the set of overlay windows would differ.
    pub fn display_selection_differs(&self, other: &Settings) -> bool {
        self.display_mode != other.display_mode || self.selected_monitors != other.selected_monitors
    }
}

/// Shared, file-backed settings.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: RwLock<Settings>,
}

impl SettingsStore {
    /// Store backed by `path`, starting from whatever the file holds.
    ///
    /// A missing file starts from the comfort preset; so does a malformed one,
    /// after logging why.
    pub fn open(path: impl Into<PathBuf>) -> Arc<Self> {
        let path = path.into();
        let settings = match Self::read_file(&path) {
            Ok(settings) => {
                info!("loaded settings from {}", path.display());
                settings
            }
            Err(SettingsError::Io { ref source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("no settings at {}, using comfort preset", path.display());
                Settings::default()
            }
            Err(e) => {
                warn!("{}; using comfort preset", e);
                Settings::default()
            }
        };
        Arc::new(Self::with_settings(path, settings))
    }

    pub fn with_settings(path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            path: path.into(),
            settings: RwLock::new(settings),
        }
    }

    /// Parse a settings file.
    pub fn read_file(path: &Path) -> Result<Settings, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SettingsError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Mutate the settings in memory. Call [`save`](Self::save) to persist.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.settings.write());
    }

    /// Back to the comfort preset.
    pub fn reset(&self) {
        *self.settings.write() = Settings::default();
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(&*self.settings.read())?;
        fs::write(&self.path, json).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("saved settings to {}", self.path.display());
        Ok(())
    }

    /// Re-read the file. Returns `true` if the settings changed.
    ///
    /// Unreadable or malformed files leave the current settings in place, so
    /// a half-written file during editing does not reset anything.
    pub fn reload(&self) -> Result<bool, SettingsError> {
        let fresh = Self::read_file(&self.path)?;
        let mut current = self.settings.write();
        if *current == fresh {
            return Ok(false);
        }
        *current = fresh;
        info!("settings reloaded from {}", self.path.display());
        Ok(true)
    }
}

/// Debounced change notifications for one settings file.
pub struct SettingsWatcher {
    // Dropping the debouncer stops the watch.
    _debouncer: Debouncer<RecommendedWatcher>,
    events: Receiver<DebounceEventResult>,
    file_name: Option<std::ffi::OsString>,
}

impl SettingsWatcher {
    /// Start watching the directory holding `path`.
    pub fn new(path: &Path) -> Result<Self, SettingsError> {
        let (tx, rx) = mpsc::channel();
        let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::NonRecursive)?;
        debug!("watching {} for settings changes", dir.display());

        Ok(Self {
            _debouncer: debouncer,
            events: rx,
            file_name: path.file_name().map(|n| n.to_os_string()),
        })
    }

    /// Drain pending events. Returns `true` if the settings file was touched.
    pub fn poll_changed(&self) -> bool {
        let mut changed = false;
        for result in self.events.try_iter() {
            match result {
                Ok(events) => {
                    changed |= events
                        .iter()
                        .any(|event| event.path.file_name() == self.file_name.as_deref());
                }
                Err(e) => warn!("settings watch error: {:?}", e),
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_path(dir: &TempDir) -> PathBuf {
        dir.path().join(DEFAULT_SETTINGS_FILE)
    }

    #[test]
    fn test_default_is_comfort() {
        let settings = Settings::default();
        assert_eq!(settings.current_preset, Preset::Comfort);
        assert_eq!(settings.max_snowflakes, 2000);
        assert_eq!(settings.snowflake_size_range, ValueRange::new(3.0, 15.0));
        assert!(settings.window_interaction);
        assert!(!settings.is_paused);
    }

    #[test]
    fn test_presets() {
        let light = Settings::from_preset(Preset::Light);
        assert_eq!(light.max_snowflakes, 800);
        assert_eq!(light.wind_strength, 0.5);

        let blizzard = Settings::from_preset(Preset::Blizzard);
        assert_eq!(blizzard.max_snowflakes, 6000);
        assert_eq!(blizzard.snowflake_speed_range, ValueRange::new(120.0, 480.0));

        let mut custom = blizzard.clone();
        custom.apply_preset(Preset::Custom);
        assert_eq!(custom.current_preset, Preset::Custom);
        assert_eq!(custom.max_snowflakes, 6000);
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("Blizzard".parse::<Preset>(), Ok(Preset::Blizzard));
        assert!("hail".parse::<Preset>().is_err());
    }

    #[test]
    fn test_range_sanitized() {
        assert_eq!(ValueRange::new(20.0, 4.0).sanitized(), ValueRange::new(4.0, 20.0));
        assert_eq!(ValueRange::new(-50.0, 100.0).sanitized(), ValueRange::new(0.0, 100.0));
    }

    #[test]
    fn test_melt_rate_has_floor() {
        let mut settings = Settings::default();
        assert_eq!(settings.melt_rate(), 3.0);

        settings.melting_speed = 0.0;
        assert_eq!(settings.melt_rate(), MIN_MELT_RATE);
        settings.melting_speed = -4.0;
        assert_eq!(settings.melt_rate(), MIN_MELT_RATE);
        settings.melting_speed = f32::NAN;
        assert_eq!(settings.melt_rate(), MIN_MELT_RATE);
    }

    #[test]
    fn test_capacity_clamped() {
        let mut settings = Settings::default();
        settings.max_snowflakes = 0;
        assert_eq!(settings.particle_capacity(), MIN_CAPACITY);
        settings.max_snowflakes = -5;
        assert_eq!(settings.particle_capacity(), MIN_CAPACITY);
        settings.max_snowflakes = 10_000_000;
        assert_eq!(settings.particle_capacity(), MAX_CAPACITY);
        settings.max_snowflakes = 2500;
        assert_eq!(settings.particle_capacity(), 2500);
    }

    #[test]
    fn test_display_selection() {
        let mut settings = Settings::default();
        assert!(settings.shows_display("DP-1"));

        settings.display_mode = DisplayMode::Selected;
        assert!(!settings.shows_display("DP-1"));

        settings.selected_monitors.insert("HDMI-1".into());
        assert!(!settings.shows_display("DP-1"));
        assert!(settings.shows_display("HDMI-1"));

        assert!(settings.display_selection_differs(&Settings::default()));
    }

    #[test]
    fn test_empty_selection_shows_nothing() {
        let mut settings = Settings::default();
        settings.display_mode = DisplayMode::Selected;
        assert!(settings.selected_monitors.is_empty());
        for name in ["DP-1", "HDMI-1", "display-0"] {
            assert!(!settings.shows_display(name));
        }
    }

    #[test]
    fn test_missing_file_is_comfort() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::open(settings_path(&dir));
        assert_eq!(store.snapshot(), Settings::default());
    }

    #[test]
    fn test_corrupt_file_is_comfort() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            SettingsStore::read_file(&path),
            Err(SettingsError::Malformed { .. })
        ));
        assert_eq!(SettingsStore::open(&path).snapshot(), Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, r#"{ "maxSnowflakes": 3000, "windowInteraction": false }"#).unwrap();

        let settings = SettingsStore::open(&path).snapshot();
        assert_eq!(settings.max_snowflakes, 3000);
        assert!(!settings.window_interaction);
        assert_eq!(settings.melting_speed, 3.0);
        assert_eq!(settings.display_mode, DisplayMode::All);
    }

    #[test]
    fn test_save_then_open() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);

        let store = SettingsStore::open(&path);
        store.update(|s| {
            s.apply_preset(Preset::Light);
            s.display_mode = DisplayMode::Selected;
            s.selected_monitors.insert("DP-2".into());
        });
        store.save().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"currentPreset\": \"light\""));
        assert_eq!(SettingsStore::open(&path).snapshot(), store.snapshot());
    }

    #[test]
    fn test_reload_reports_change() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        let store = SettingsStore::open(&path);
        store.save().unwrap();

        assert!(!store.reload().unwrap());

        fs::write(&path, r#"{ "isPaused": true }"#).unwrap();
        assert!(store.reload().unwrap());
        assert!(store.snapshot().is_paused);
    }

    #[test]
    fn test_reload_keeps_settings_on_bad_file() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        let store = SettingsStore::open(&path);
        store.update(|s| s.wind_strength = 3.0);

        fs::write(&path, "{").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.snapshot().wind_strength, 3.0);
    }

    #[test]
    fn test_reset() {
        let store = SettingsStore::with_settings("unused.json", Settings::from_preset(Preset::Blizzard));
        store.reset();
        assert_eq!(store.snapshot(), Settings::default());
    }

    #[test]
    fn test_watcher_starts_quiet() {
        let dir = TempDir::new().unwrap();
        let watcher = SettingsWatcher::new(&settings_path(&dir)).unwrap();
        assert!(!watcher.poll_changed());
    }
}
