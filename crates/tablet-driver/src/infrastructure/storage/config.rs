//! TOML-based configuration for the tablet driver.
//!
//! Reads and writes [`AppConfig`] from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\TabletDriver\config.toml`
//! - Linux:    `~/.config/tabletdriver/config.toml`
//! - macOS:    `~/Library/Application Support/TabletDriver/config.toml`
//!
//! A path given on the command line replaces the platform location; see
//! [`load_config_from`].
//!
//! # Example
//!
//! ```toml
//! [driver]
//! log_level = "info"
//! suppress = 2
//!
//! [display]
//! layout = "horizontal"
//! screens = [{ width = 1920, height = 1080 }, { width = 1920, height = 1080 }]
//!
//! [[devices]]
//! name = "pen"
//! path = "/var/lib/tabletdriver/intuos.capture"
//! type = "stylus"
//! auto_hotplug = true
//!
//! [[devices]]
//! name = "left half"
//! path = "/var/lib/tabletdriver/intuos.capture"
//! type = "stylus"
//! top_x = 0
//! top_y = 0
//! bottom_x = 9999
//! bottom_y = 15000
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a file only needs the
//! settings that differ from the defaults, and a missing file is the same as
//! an empty one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tablet_core::{
    DisplayLayout, LayoutError, LayoutKind, LinkSettings, MappedArea, Mode, Rotation,
    ScreenGeometry, ToolType,
};
use thiserror::Error;

use crate::application::manage_devices::DeviceSpec;
use crate::application::update_properties::{MAX_RAW_SAMPLE, MAX_SUPPRESS};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file parsed but a setting is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// Driver-wide settings.  The filter settings seed every link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Minimum change before a report is passed on.
    #[serde(default = "default_suppress")]
    pub suppress: i32,
    /// Window of the raw averaging filter.
    #[serde(default = "default_raw_sample")]
    pub raw_sample: usize,
    #[serde(default)]
    pub raw_filter: bool,
    /// Turn out-of-proximity button reports into key events.
    #[serde(default = "default_true")]
    pub macro_keys: bool,
}

/// Host screens and how they are arranged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default)]
    pub layout: LayoutKind,
    #[serde(default = "default_screens")]
    pub screens: Vec<ScreenEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScreenEntry {
    pub width: u32,
    pub height: u32,
}

/// One configured logical device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceEntry {
    pub name: String,
    /// Device file or capture the tablet is read from.
    pub path: String,
    #[serde(rename = "type")]
    pub tool: ToolType,
    #[serde(default)]
    pub serial: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_y: Option<i32>,
    /// Defaults to absolute for pens and touch, relative for pucks and pads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Screen to pin to; `-1` follows the display layout.
    #[serde(default = "default_screen_no")]
    pub screen_no: i32,
    #[serde(default)]
    pub buttons_only: bool,
    #[serde(default)]
    pub core_pointer: bool,
    #[serde(default = "default_press_curve")]
    pub press_curve: [i32; 4],
    /// Host button for physical buttons 1, 2, 3 …
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<u16>,
    /// Create a device for every other tool the tablet reports.
    #[serde(default)]
    pub auto_hotplug: bool,
    #[serde(default)]
    pub rotate: Rotation,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_suppress() -> i32 {
    2
}
fn default_raw_sample() -> usize {
    4
}
fn default_true() -> bool {
    true
}
fn default_screens() -> Vec<ScreenEntry> {
    vec![ScreenEntry {
        width: 1920,
        height: 1080,
    }]
}
fn default_speed() -> f64 {
    1.0
}
fn default_screen_no() -> i32 {
    -1
}
fn default_press_curve() -> [i32; 4] {
    [0, 0, 100, 100]
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            suppress: default_suppress(),
            raw_sample: default_raw_sample(),
            raw_filter: false,
            macro_keys: default_true(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            layout: LayoutKind::None,
            screens: default_screens(),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl AppConfig {
    /// Checks settings that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.driver;
        if !(0..=MAX_SUPPRESS).contains(&d.suppress) {
            return Err(ConfigError::Invalid(format!(
                "suppress {} is outside 0..={MAX_SUPPRESS}",
                d.suppress
            )));
        }
        if !(1..=MAX_RAW_SAMPLE).contains(&d.raw_sample) {
            return Err(ConfigError::Invalid(format!(
                "raw_sample {} is outside 1..={MAX_RAW_SAMPLE}",
                d.raw_sample
            )));
        }
        let mut names = HashSet::new();
        for device in &self.devices {
            if device.path.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("device '{}' has no path", device.name)));
            }
            if !names.insert(device.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "device name '{}' is used twice",
                    device.name
                )));
            }
        }
        Ok(())
    }
}

impl DriverConfig {
    /// Filter settings every link starts with.
    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            suppress: self.suppress,
            raw_sample: self.raw_sample,
            raw_filter: self.raw_filter,
            rotation: Rotation::None,
            macro_keys: self.macro_keys,
        }
    }
}

impl DisplayConfig {
    /// Builds the display layout.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] for a vertical layout, no screens, or a
    /// zero-sized screen.
    pub fn to_layout(&self) -> Result<DisplayLayout, LayoutError> {
        let screens = self
            .screens
            .iter()
            .map(|s| ScreenGeometry::new(s.width, s.height))
            .collect();
        DisplayLayout::new(self.layout, screens)
    }
}

impl DeviceEntry {
    /// Converts the file entry to a device spec.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if only some of the area corners are
    /// set.
    pub fn to_spec(&self) -> Result<DeviceSpec, ConfigError> {
        let area = match (self.top_x, self.top_y, self.bottom_x, self.bottom_y) {
            (None, None, None, None) => None,
            (Some(tx), Some(ty), Some(bx), Some(by)) => Some(MappedArea::new(tx, ty, bx, by)),
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "device '{}': set all of top_x, top_y, bottom_x, bottom_y or none",
                    self.name
                )))
            }
        };
        Ok(DeviceSpec {
            name: self.name.clone(),
            path: self.path.clone(),
            tool: self.tool,
            serial: self.serial,
            area,
            mode: self.mode,
            speed: self.speed,
            screen_no: self.screen_no,
            buttons_only: self.buttons_only,
            core_pointer: self.core_pointer,
            press_curve: self.press_curve,
            buttons: self.buttons.clone(),
            auto_hotplug: self.auto_hotplug,
            rotate: self.rotate,
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from the platform location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads and validates the config at `path`, returning
/// `AppConfig::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if validation fails.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let cfg = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str::<AppConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Persists `config` to the platform location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Persists `config` to `path`, creating the directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory including the `TabletDriver` part.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("TabletDriver"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("tabletdriver"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("TabletDriver")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
