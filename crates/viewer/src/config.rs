//! Configuration management for the DesktopBlocks viewer.
//!
//! The first `config.toml` found wins: the per-user config directory, then
//! `~/.config/desktopblocks`, then the working directory. Every field has a
//! default, so a file only needs the values it changes. The viewer only
//! reads the file; zoom level and selection are never persisted.

use anyhow::{Context, Result};
use desktopblocks_core::overlay::DEFAULT_MAX_HEIGHT;
use desktopblocks_core::transform::{DEFAULT_ZOOM_STEP, MAX_ZOOM, MIN_ZOOM};
use desktopblocks_core::{OverlayOptions, Palette, Rgb, SessionOptions, Stroke};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for DesktopBlocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Zoom, pan and layout of the viewer window.
    pub view: ViewConfig,
    /// Colors and line widths.
    pub appearance: AppearanceConfig,
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
    /// Screenshot overlay mode.
    pub overlay: OverlayConfig,
}

/// View-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Multiplicative zoom step per click or key press.
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,

    /// Lower bound of the zoom factor.
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,

    /// Upper bound of the zoom factor.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,

    /// View pixels moved per arrow-key press.
    #[serde(default = "default_pan_step")]
    pub pan_step: f64,

    /// Width of the window list in pixels.
    #[serde(default = "default_list_width")]
    pub list_width: i32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            zoom_step: default_zoom_step(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            pan_step: default_pan_step(),
            list_width: default_list_width(),
        }
    }
}

/// Appearance-related configuration. Colors are `#RRGGBB`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    #[serde(default = "default_background")]
    pub background: String,

    #[serde(default = "default_monitor_color")]
    pub monitor: String,

    #[serde(default = "default_window_color")]
    pub window: String,

    /// Outline color of the selected window.
    #[serde(default = "default_selected_color")]
    pub selected: String,

    /// Window title color.
    #[serde(default = "default_label_color")]
    pub label: String,

    #[serde(default = "default_selected_width")]
    pub selected_width: f32,

    #[serde(default = "default_line_width")]
    pub window_width: f32,

    #[serde(default = "default_line_width")]
    pub monitor_width: f32,

    /// Draw the device name, size and scale of each monitor.
    #[serde(default = "default_true")]
    pub show_monitor_labels: bool,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            monitor: default_monitor_color(),
            window: default_window_color(),
            selected: default_selected_color(),
            label: default_label_color(),
            selected_width: default_selected_width(),
            window_width: default_line_width(),
            monitor_width: default_line_width(),
            show_monitor_labels: true,
        }
    }
}

/// Rendering mode of the viewer window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerMode {
    /// Zoomable wireframe of every monitor and window.
    #[default]
    Wireframe,
    /// Screenshot of the primary monitor with window outlines on top.
    Overlay,
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub mode: ViewerMode,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            mode: ViewerMode::default(),
        }
    }
}

/// Screenshot overlay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Maximum height of the overlay window in pixels.
    #[serde(default = "default_max_height")]
    pub max_height: i32,

    /// Draw the monitor/window/scale line in the corner.
    #[serde(default = "default_true")]
    pub show_debug_info: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            max_height: default_max_height(),
            show_debug_info: true,
        }
    }
}

// Default value functions for serde
fn default_zoom_step() -> f64 {
    DEFAULT_ZOOM_STEP
}

fn default_min_zoom() -> f64 {
    MIN_ZOOM
}

fn default_max_zoom() -> f64 {
    MAX_ZOOM
}

fn default_pan_step() -> f64 {
    50.0
}

fn default_list_width() -> i32 {
    320
}

fn default_background() -> String {
    "#FFFFFF".to_string()
}

fn default_monitor_color() -> String {
    "#FF0000".to_string()
}

fn default_window_color() -> String {
    "#0000FF".to_string()
}

fn default_selected_color() -> String {
    "#FF0000".to_string()
}

fn default_label_color() -> String {
    "#000000".to_string()
}

fn default_selected_width() -> f32 {
    3.0
}

fn default_line_width() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_height() -> i32 {
    DEFAULT_MAX_HEIGHT
}

/// A value that was out of range and has been reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &str, message: String) -> Self {
        Self {
            field: field.to_string(),
            message,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Read the first file from [`config_paths`] that exists. With no file
    /// the viewer runs on defaults.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse one TOML file. Values are not checked here; call
    /// [`validate`](Self::validate) before use.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reset out-of-range values to their defaults.
    ///
    /// Returns one warning per value that was changed.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !(self.view.zoom_step.is_finite() && self.view.zoom_step > 1.0) {
            warnings.push(ConfigWarning::new(
                "view.zoom_step",
                format!(
                    "{} must be greater than 1, using {}",
                    self.view.zoom_step, DEFAULT_ZOOM_STEP
                ),
            ));
            self.view.zoom_step = default_zoom_step();
        }
        if !(self.view.min_zoom.is_finite() && self.view.min_zoom > 0.0) {
            warnings.push(ConfigWarning::new(
                "view.min_zoom",
                format!("{} must be positive, using {}", self.view.min_zoom, MIN_ZOOM),
            ));
            self.view.min_zoom = default_min_zoom();
        }
        if !(self.view.max_zoom.is_finite() && self.view.max_zoom >= self.view.min_zoom) {
            warnings.push(ConfigWarning::new(
                "view.max_zoom",
                format!(
                    "{} must be finite and at least min_zoom ({}), using {}",
                    self.view.max_zoom, self.view.min_zoom, MAX_ZOOM
                ),
            ));
            self.view.max_zoom = default_max_zoom().max(self.view.min_zoom);
        }
        if !(self.view.pan_step.is_finite() && self.view.pan_step > 0.0) {
            warnings.push(ConfigWarning::new(
                "view.pan_step",
                format!("{} must be positive, using 50", self.view.pan_step),
            ));
            self.view.pan_step = default_pan_step();
        }
        if self.view.list_width < 1 {
            warnings.push(ConfigWarning::new(
                "view.list_width",
                format!("{} must be at least 1, using 320", self.view.list_width),
            ));
            self.view.list_width = default_list_width();
        }

        let a = &mut self.appearance;
        for (field, value, default) in [
            ("appearance.background", &mut a.background, default_background()),
            ("appearance.monitor", &mut a.monitor, default_monitor_color()),
            ("appearance.window", &mut a.window, default_window_color()),
            ("appearance.selected", &mut a.selected, default_selected_color()),
            ("appearance.label", &mut a.label, default_label_color()),
        ] {
            if Rgb::from_hex(value).is_none() {
                warnings.push(ConfigWarning::new(
                    field,
                    format!("'{}' is not a #RRGGBB color, using {}", value, default),
                ));
                *value = default;
            }
        }
        for (field, value, default) in [
            ("appearance.selected_width", &mut a.selected_width, default_selected_width()),
            ("appearance.window_width", &mut a.window_width, default_line_width()),
            ("appearance.monitor_width", &mut a.monitor_width, default_line_width()),
        ] {
            if !(value.is_finite() && *value >= 1.0) {
                warnings.push(ConfigWarning::new(
                    field,
                    format!("{} must be at least 1, using {}", value, default),
                ));
                *value = default;
            }
        }

        let level = self.behavior.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            warnings.push(ConfigWarning::new(
                "behavior.log_level",
                format!("unknown level '{}', using info", self.behavior.log_level),
            ));
            self.behavior.log_level = default_log_level();
        }

        if self.overlay.max_height < 1 {
            warnings.push(ConfigWarning::new(
                "overlay.max_height",
                format!(
                    "{} must be at least 1, using {}",
                    self.overlay.max_height, DEFAULT_MAX_HEIGHT
                ),
            ));
            self.overlay.max_height = default_max_height();
        }

        warnings
    }

    /// Scene styles. Colors that fail to parse fall back to the defaults.
    pub fn palette(&self) -> Palette {
        let defaults = Palette::default();
        let a = &self.appearance;
        let color = |s: &str, fallback: Rgb| Rgb::from_hex(s).unwrap_or(fallback);
        Palette {
            background: color(&a.background, defaults.background),
            monitor: Stroke::new(color(&a.monitor, defaults.monitor.color), a.monitor_width),
            window: Stroke::new(color(&a.window, defaults.window.color), a.window_width),
            selected: Stroke::new(color(&a.selected, defaults.selected.color), a.selected_width),
            label: color(&a.label, defaults.label),
            show_monitor_labels: a.show_monitor_labels,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            palette: self.palette(),
            zoom_step: self.view.zoom_step,
            min_zoom: self.view.min_zoom,
            max_zoom: self.view.max_zoom,
        }
    }

    pub fn overlay_options(&self) -> OverlayOptions {
        OverlayOptions {
            show_debug_info: self.overlay.show_debug_info,
            ..OverlayOptions::default()
        }
    }
}

/// Candidate config files, highest priority first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // %APPDATA%\desktopblocks\desktopblocks\config on Windows
    if let Some(proj_dirs) = ProjectDirs::from("com", "desktopblocks", "desktopblocks") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("desktopblocks").join("config.toml"));
    }

    // Working directory, for running from a checkout.
    paths.push(PathBuf::from("config.toml"));

    paths
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.view.zoom_step, 1.2);
        assert_eq!(config.view.min_zoom, 0.01);
        assert_eq!(config.view.max_zoom, 1e4);
        assert_eq!(config.view.pan_step, 50.0);
        assert_eq!(config.view.list_width, 320);
        assert_eq!(config.appearance.window, "#0000FF");
        assert_eq!(config.behavior.log_level, "info");
        assert_eq!(config.behavior.mode, ViewerMode::Wireframe);
        assert_eq!(config.overlay.max_height, 1080);
    }

    #[test]
    fn test_default_palette_matches_core() {
        assert_eq!(Config::default().palette(), Palette::default());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.view.zoom_step, config.view.zoom_step);
        assert_eq!(parsed.behavior.mode, config.behavior.mode);
    }

    #[test]
    fn test_config_partial_parse() {
        // Config with only some fields should use defaults for the rest
        let toml_str = r#"
            [view]
            zoom_step = 1.5
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.view.zoom_step, 1.5);
        assert_eq!(config.view.min_zoom, 0.01); // default
        assert_eq!(config.appearance.selected_width, 3.0); // default
    }

    #[test]
    fn test_mode_parse() {
        let toml_str = r#"
            [behavior]
            mode = "overlay"
            log_level = "debug"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.behavior.mode, ViewerMode::Overlay);
        assert_eq!(config.behavior.log_level, "debug");
    }

    #[test]
    fn test_config_paths_not_empty() {
        let paths = config_paths();
        assert!(!paths.is_empty());
        assert_eq!(paths.last(), Some(&PathBuf::from("config.toml")));
    }

    #[test]
    fn test_validate_default_is_clean() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_resets_bad_values() {
        let toml_str = r##"
            [view]
            zoom_step = 0.5
            min_zoom = 0.0
            max_zoom = 0.001
            list_width = 0

            [appearance]
            window = "blue"
            selected_width = 0.0

            [behavior]
            log_level = "loud"

            [overlay]
            max_height = -5
        "##;
        let mut config: Config = toml::from_str(toml_str).unwrap();
        let warnings = config.validate();

        let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "view.zoom_step",
                "view.min_zoom",
                "view.max_zoom",
                "view.list_width",
                "appearance.window",
                "appearance.selected_width",
                "behavior.log_level",
                "overlay.max_height",
            ]
        );
        assert_eq!(config.view.zoom_step, 1.2);
        assert_eq!(config.view.min_zoom, 0.01);
        assert_eq!(config.view.max_zoom, 1e4);
        assert_eq!(config.view.list_width, 320);
        assert_eq!(config.appearance.window, "#0000FF");
        assert_eq!(config.appearance.selected_width, 3.0);
        assert_eq!(config.behavior.log_level, "info");
        assert_eq!(config.overlay.max_height, 1080);
    }

    #[test]
    fn test_custom_palette() {
        let toml_str = r##"
            [appearance]
            background = "#101010"
            selected = "#00FF00"
            selected_width = 5.0
            show_monitor_labels = false
        "##;
        let config: Config = toml::from_str(toml_str).unwrap();
        let palette = config.palette();
        assert_eq!(palette.background, Rgb::new(0x10, 0x10, 0x10));
        assert_eq!(palette.selected, Stroke::new(Rgb::LIME, 5.0));
        assert_eq!(palette.window, Stroke::new(Rgb::BLUE, 1.0));
        assert!(!palette.show_monitor_labels);
    }

    #[test]
    fn test_session_and_overlay_options() {
        let toml_str = r#"
            [view]
            zoom_step = 2.0

            [overlay]
            show_debug_info = false
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session_options().zoom_step, 2.0);
        assert_eq!(config.session_options().min_zoom, 0.01);
        assert_eq!(config.session_options().max_zoom, 1e4);
        assert!(!config.overlay_options().show_debug_info);
    }
}
