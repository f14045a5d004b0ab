//! Shared state: user settings plus the latest computed outputs.
//!
//! One coarse lock guards the whole record. The console mutates settings
//! through the methods below, the scheduler writes outputs and the
//! synchronizer reads them. Nobody holds the lock across I/O.

use casecontrol_hw::Rgb;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::modes::{blank_text, mode_names, CaseMode, LcdMode, LcdText};

/// Current settings file format.
pub const SETTINGS_VERSION: u32 = 1;

/// Fade tick range.
pub const FADE_TICKS_MIN: u32 = 10;
pub const FADE_TICKS_MAX: u32 = 200;

/// Pause tick range.
pub const PAUSE_TICKS_MIN: u32 = 0;
pub const PAUSE_TICKS_MAX: u32 = 200;

/// Errors from user requests. State is left unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Unknown case mode '{0}', expected one of: {modes}", modes = mode_names(&CaseMode::ALL))]
    UnknownCaseMode(String),

    #[error("Unknown LCD mode '{0}', expected one of: {modes}", modes = mode_names(&LcdMode::ALL))]
    UnknownLcdMode(String),

    #[error("Invalid color '{0}', use R/G/B, #RRGGBB or a color name")]
    InvalidColor(String),

    #[error("Invalid index {index}, the fade list has {len} colors")]
    FadeIndexOutOfRange { index: usize, len: usize },

    #[error("No saved fade set named '{0}'")]
    UnknownFadeSet(String),

    #[error("Cannot save an empty fade list")]
    EmptyFadeList,
}

/// Settings persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// File format version.
    pub version: u32,

    #[serde(default)]
    pub case_mode: CaseMode,

    #[serde(default)]
    pub case_static_color: Rgb,

    #[serde(default)]
    pub case_fade_colors: Vec<Rgb>,

    /// Ticks to interpolate between two fade colors (10-200).
    #[serde(default = "default_fade_ticks")]
    pub case_fade_ticks: u32,

    /// Ticks to hold each fade color (0-200).
    #[serde(default = "default_pause_ticks")]
    pub case_pause_ticks: u32,

    #[serde(default)]
    pub lcd_mode: LcdMode,

    #[serde(default)]
    pub lcd_static_color: Rgb,

    /// Named copies of fade lists. Kept last so it serializes as a table.
    #[serde(default)]
    pub saved_fade_sets: BTreeMap<String, Vec<Rgb>>,
}

fn default_fade_ticks() -> u32 {
    50
}

fn default_pause_ticks() -> u32 {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            case_mode: CaseMode::default(),
            case_static_color: Rgb::BLACK,
            case_fade_colors: Vec::new(),
            case_fade_ticks: default_fade_ticks(),
            case_pause_ticks: default_pause_ticks(),
            lcd_mode: LcdMode::default(),
            lcd_static_color: Rgb::BLACK,
            saved_fade_sets: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Brings tick counts back into range.
    fn sanitize(&mut self) {
        self.case_fade_ticks = clamp_ticks(
            i64::from(self.case_fade_ticks),
            FADE_TICKS_MIN,
            FADE_TICKS_MAX,
        );
        self.case_pause_ticks = clamp_ticks(
            i64::from(self.case_pause_ticks),
            PAUSE_TICKS_MIN,
            PAUSE_TICKS_MAX,
        );
    }

    /// Parses settings from a file's contents, rejecting other versions.
    fn from_toml(content: &str) -> anyhow::Result<Self> {
        let mut settings: Settings = toml::from_str(content)?;
        if settings.version != SETTINGS_VERSION {
            anyhow::bail!(
                "unsupported settings version {} (expected {})",
                settings.version,
                SETTINGS_VERSION
            );
        }
        settings.sanitize();
        Ok(settings)
    }
}

fn clamp_ticks(value: i64, min: u32, max: u32) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}

fn parse_color(input: &str) -> Result<Rgb, StateError> {
    input
        .parse()
        .map_err(|_| StateError::InvalidColor(input.trim().to_string()))
}

/// Latest computed outputs. Written by the scheduler only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub case_color: Rgb,
    pub lcd_color: Rgb,
    pub lcd_text: LcdText,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            case_color: Rgb::BLACK,
            lcd_color: Rgb::BLACK,
            lcd_text: blank_text(),
        }
    }
}

struct Record {
    settings: Settings,
    output: Output,
}

/// The state shared by the console, the scheduler and the synchronizer.
pub struct SharedState {
    record: Mutex<Record>,

    /// Where settings are persisted, if anywhere
    state_file: Option<PathBuf>,
}

impl SharedState {
    /// Creates state from settings.
    pub fn new(mut settings: Settings, state_file: Option<PathBuf>) -> Self {
        settings.sanitize();
        Self {
            record: Mutex::new(Record {
                settings,
                output: Output::default(),
            }),
            state_file,
        }
    }

    /// Creates state that is never written to disk.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Settings::default(), None)
    }

    /// Loads settings from the state file, falling back to defaults when
    /// the file is missing, unreadable or from another version.
    pub fn load<P: AsRef<Path>>(state_file: P) -> Self {
        let path = state_file.as_ref();
        let settings = match std::fs::read_to_string(path) {
            Ok(content) => match Settings::from_toml(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Discarding saved settings in {:?}: {}", path, e);
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No saved settings at {:?}, using defaults", path);
                Settings::default()
            }
            Err(e) => {
                warn!("Failed to read saved settings {:?}: {}", path, e);
                Settings::default()
            }
        };
        Self::new(settings, Some(path.to_path_buf()))
    }

    fn lock(&self) -> MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the settings to the state file.
    pub fn save(&self) {
        let Some(path) = &self.state_file else {
            return;
        };
        let settings = self.settings();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create state directory {:?}: {}", parent, e);
                return;
            }
        }
        match toml::to_string_pretty(&settings) {
            Ok(content) => {
                if let Err(e) = std::fs::write(path, content) {
                    warn!("Failed to save settings: {}", e);
                } else {
                    debug!("Saved settings to {:?}", path);
                }
            }
            Err(e) => {
                warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Applies a settings change that cannot fail and persists it.
    fn update_with<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        f(&mut self.lock().settings);
        self.save();
    }

    /// Applies a settings change and persists it if it succeeded.
    fn update<T, F>(&self, f: F) -> Result<T, StateError>
    where
        F: FnOnce(&mut Settings) -> Result<T, StateError>,
    {
        let result = {
            let mut record = self.lock();
            f(&mut record.settings)
        }?;
        self.save();
        Ok(result)
    }

    /// Returns a copy of the settings.
    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    /// Returns a copy of the latest outputs.
    pub fn output(&self) -> Output {
        self.lock().output.clone()
    }

    /// Stores freshly computed outputs.
    pub fn set_output(&self, output: Output) {
        self.lock().output = output;
    }

    /// Returns the selected LCD mode.
    pub fn lcd_mode(&self) -> LcdMode {
        self.lock().settings.lcd_mode
    }

    /// Selects the case lighting mode by name.
    pub fn set_case_mode(&self, name: &str) -> Result<CaseMode, StateError> {
        let mode: CaseMode = name.parse()?;
        self.update(|settings| {
            settings.case_mode = mode;
            Ok(mode)
        })?;
        info!("Case mode set to {}", mode);
        Ok(mode)
    }

    /// Selects the LCD mode by name.
    pub fn set_lcd_mode(&self, name: &str) -> Result<LcdMode, StateError> {
        let mode: LcdMode = name.parse()?;
        self.update(|settings| {
            settings.lcd_mode = mode;
            Ok(mode)
        })?;
        info!("LCD mode set to {}", mode);
        Ok(mode)
    }

    /// Sets the static case color.
    pub fn set_case_color(&self, color: &str) -> Result<Rgb, StateError> {
        let color = parse_color(color)?;
        self.update(|settings| {
            settings.case_static_color = color;
            Ok(color)
        })
    }

    /// Sets the static LCD color.
    pub fn set_lcd_color(&self, color: &str) -> Result<Rgb, StateError> {
        let color = parse_color(color)?;
        self.update(|settings| {
            settings.lcd_static_color = color;
            Ok(color)
        })
    }

    /// Appends a fade color, returning the new list length.
    pub fn add_fade_color(&self, color: &str) -> Result<usize, StateError> {
        let color = parse_color(color)?;
        self.update(|settings| {
            settings.case_fade_colors.push(color);
            Ok(settings.case_fade_colors.len())
        })
    }

    /// Removes the fade color at `index`.
    pub fn remove_fade_color(&self, index: usize) -> Result<Rgb, StateError> {
        self.update(|settings| {
            let len = settings.case_fade_colors.len();
            if index >= len {
                return Err(StateError::FadeIndexOutOfRange { index, len });
            }
            Ok(settings.case_fade_colors.remove(index))
        })
    }

    /// Empties the active fade list.
    pub fn clear_fade_colors(&self) {
        self.update_with(|settings| settings.case_fade_colors.clear());
    }

    /// Sets the fade ticks, clamped to 10-200. Returns the stored value.
    pub fn set_fade_ticks(&self, ticks: i64) -> u32 {
        let ticks = clamp_ticks(ticks, FADE_TICKS_MIN, FADE_TICKS_MAX);
        self.update_with(|settings| settings.case_fade_ticks = ticks);
        ticks
    }

    /// Sets the pause ticks, clamped to 0-200. Returns the stored value.
    pub fn set_pause_ticks(&self, ticks: i64) -> u32 {
        let ticks = clamp_ticks(ticks, PAUSE_TICKS_MIN, PAUSE_TICKS_MAX);
        self.update_with(|settings| settings.case_pause_ticks = ticks);
        ticks
    }

    /// Saves the active fade list under `name`, replacing any set with
    /// that name. Returns the number of colors saved.
    pub fn save_fade_set(&self, name: &str) -> Result<usize, StateError> {
        self.update(|settings| {
            if settings.case_fade_colors.is_empty() {
                return Err(StateError::EmptyFadeList);
            }
            let colors = settings.case_fade_colors.clone();
            let len = colors.len();
            settings.saved_fade_sets.insert(name.to_string(), colors);
            Ok(len)
        })
    }

    /// Replaces the active fade list with a saved set.
    pub fn load_fade_set(&self, name: &str) -> Result<usize, StateError> {
        self.update(|settings| {
            let colors = settings
                .saved_fade_sets
                .get(name)
                .cloned()
                .ok_or_else(|| StateError::UnknownFadeSet(name.to_string()))?;
            let len = colors.len();
            settings.case_fade_colors = colors;
            Ok(len)
        })
    }

    /// Deletes a saved set.
    pub fn delete_fade_set(&self, name: &str) -> Result<(), StateError> {
        self.update(|settings| {
            settings
                .saved_fade_sets
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| StateError::UnknownFadeSet(name.to_string()))
        })
    }

    /// Lists saved sets by name.
    pub fn fade_sets(&self) -> Vec<(String, Vec<Rgb>)> {
        self.lock()
            .settings
            .saved_fade_sets
            .iter()
            .map(|(name, colors)| (name.clone(), colors.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const GREEN: Rgb = Rgb::new(0, 255, 0);

    fn temp_state_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("casecontrol-state-{}-{}", std::process::id(), name))
            .join("settings.toml")
    }

    #[test]
    fn test_tick_clamping() {
        let state = SharedState::in_memory();
        assert_eq!(state.set_fade_ticks(5), 10);
        assert_eq!(state.settings().case_fade_ticks, 10);
        assert_eq!(state.set_fade_ticks(5000), 200);
        assert_eq!(state.settings().case_fade_ticks, 200);
        assert_eq!(state.set_fade_ticks(75), 75);

        assert_eq!(state.set_pause_ticks(-3), 0);
        assert_eq!(state.set_pause_ticks(201), 200);
        assert_eq!(state.settings().case_pause_ticks, 200);
    }

    #[test]
    fn test_invalid_mode_leaves_state_unchanged() {
        let state = SharedState::in_memory();
        state.set_case_mode("static").unwrap();

        let err = state.set_case_mode("glow").unwrap_err();
        assert_eq!(err, StateError::UnknownCaseMode("glow".to_string()));
        assert!(err.to_string().contains("glow"));
        assert_eq!(state.settings().case_mode, CaseMode::Static);

        assert!(state.set_lcd_mode("glow").is_err());
        assert_eq!(state.settings().lcd_mode, LcdMode::Off);
    }

    #[test]
    fn test_colors_from_triples_and_names() {
        let state = SharedState::in_memory();
        assert_eq!(state.set_case_color("10/20/30").unwrap(), Rgb::new(10, 20, 30));
        assert_eq!(state.set_lcd_color("Magenta").unwrap(), Rgb::new(255, 0, 255));
        assert_eq!(
            state.set_case_color("sparkly"),
            Err(StateError::InvalidColor("sparkly".to_string()))
        );
        let settings = state.settings();
        assert_eq!(settings.case_static_color, Rgb::new(10, 20, 30));
        assert_eq!(settings.lcd_static_color, Rgb::new(255, 0, 255));
    }

    #[test]
    fn test_fade_list_edits() {
        let state = SharedState::in_memory();
        assert_eq!(state.add_fade_color("red").unwrap(), 1);
        assert_eq!(state.add_fade_color("0/255/0").unwrap(), 2);
        assert_eq!(state.add_fade_color("blue").unwrap(), 3);

        assert_eq!(
            state.remove_fade_color(3),
            Err(StateError::FadeIndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(state.remove_fade_color(2).unwrap(), Rgb::new(0, 0, 255));
        assert_eq!(state.settings().case_fade_colors, vec![RED, GREEN]);

        state.clear_fade_colors();
        assert!(state.settings().case_fade_colors.is_empty());
    }

    #[test]
    fn test_save_clear_load_fade_set() {
        let state = SharedState::in_memory();
        for color in ["red", "orange", "magenta"] {
            state.add_fade_color(color).unwrap();
        }
        let original = state.settings().case_fade_colors;

        assert_eq!(state.save_fade_set("sunset").unwrap(), 3);
        state.clear_fade_colors();
        assert!(state.settings().case_fade_colors.is_empty());

        assert_eq!(state.load_fade_set("sunset").unwrap(), 3);
        assert_eq!(state.settings().case_fade_colors, original);
    }

    #[test]
    fn test_fade_set_errors() {
        let state = SharedState::in_memory();
        assert_eq!(state.save_fade_set("empty"), Err(StateError::EmptyFadeList));
        assert_eq!(
            state.load_fade_set("missing"),
            Err(StateError::UnknownFadeSet("missing".to_string()))
        );

        state.add_fade_color("red").unwrap();
        state.save_fade_set("Warm").unwrap();
        // Names are case-sensitive
        assert!(state.delete_fade_set("warm").is_err());
        state.delete_fade_set("Warm").unwrap();
        assert!(state.fade_sets().is_empty());
    }

    #[test]
    fn test_fade_sets_sorted_and_overwritten() {
        let state = SharedState::in_memory();
        state.add_fade_color("red").unwrap();
        state.save_fade_set("zeta").unwrap();
        state.save_fade_set("alpha").unwrap();
        state.add_fade_color("green").unwrap();
        state.save_fade_set("zeta").unwrap();

        let sets = state.fade_sets();
        assert_eq!(sets[0], ("alpha".to_string(), vec![RED]));
        assert_eq!(sets[1], ("zeta".to_string(), vec![RED, GREEN]));
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = temp_state_file("round-trip");
        let state = SharedState::load(&path);
        state.set_case_mode("fade").unwrap();
        state.set_lcd_mode("nhl").unwrap();
        state.add_fade_color("255/0/0").unwrap();
        state.add_fade_color("0/255/0").unwrap();
        state.set_fade_ticks(10);
        state.set_pause_ticks(0);
        state.save_fade_set("two tone").unwrap();

        let restored = SharedState::load(&path);
        assert_eq!(restored.settings(), state.settings());
        assert_eq!(restored.settings().lcd_mode, LcdMode::Standings);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_clamped_ticks_and_clear_are_saved() {
        let path = temp_state_file("clamped");
        let state = SharedState::load(&path);
        state.add_fade_color("red").unwrap();
        state.set_fade_ticks(500);
        state.set_pause_ticks(-1);
        state.clear_fade_colors();

        let restored = SharedState::load(&path).settings();
        assert_eq!(restored.case_fade_ticks, 200);
        assert_eq!(restored.case_pause_ticks, 0);
        assert!(restored.case_fade_colors.is_empty());

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_version_mismatch_falls_back_to_defaults() {
        let path = temp_state_file("version");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "version = 7\ncase_mode = \"fade\"\n").unwrap();
        assert_eq!(SharedState::load(&path).settings(), Settings::default());

        std::fs::write(&path, "this is not toml ===").unwrap();
        assert_eq!(SharedState::load(&path).settings(), Settings::default());

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_loaded_ticks_are_clamped() {
        let settings = Settings::from_toml(
            "version = 1\ncase_fade_ticks = 3\ncase_pause_ticks = 900\n",
        )
        .unwrap();
        assert_eq!(settings.case_fade_ticks, 10);
        assert_eq!(settings.case_pause_ticks, 200);
    }

    #[test]
    fn test_output_snapshot() {
        let state = SharedState::in_memory();
        assert_eq!(state.output(), Output::default());
        let output = Output {
            case_color: RED,
            lcd_color: GREEN,
            lcd_text: ["a", "b", "c", "d"].map(String::from),
        };
        state.set_output(output.clone());
        assert_eq!(state.output(), output);
    }
}
