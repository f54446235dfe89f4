// ============================================================================
// ENGINE SETTINGS — persisted as TOML in the per-user config directory
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::canvas::CanvasStyle;
use crate::error::{EngineError, Result};
use crate::ops::fill::FILL_STACK_CAPACITY;

const SETTINGS_FILE: &str = "rasterkit.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Margin added around every image, excluded from the clip.
    pub overscroll: i32,
    /// Rows between progress callbacks during long transforms.
    pub progress_interval: i32,
    pub fill_stack_capacity: usize,
    /// Largest width or height a transform may produce.
    pub max_image_size: i32,
    pub min_rotate_scale: f64,
    pub max_rotate_scale: f64,
    pub history_depth: usize,
    pub style: CanvasStyle,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            overscroll: 64,
            progress_interval: 64,
            fill_stack_capacity: FILL_STACK_CAPACITY,
            max_image_size: 10000,
            min_rotate_scale: 0.01,
            max_rotate_scale: 10.0,
            history_depth: crate::components::history::HISTORY_DEPTH,
            style: CanvasStyle::default(),
        }
    }
}

impl EngineSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        let mut settings: Self = toml::from_str(&text)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Defaults when the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                error!("Error reading settings file: {}", err);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        fs::write(path, text).map_err(|e| EngineError::io(path, e))
    }

    /// Pull hand-edited values back into workable ranges.
    fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.overscroll < 0 {
            warn!("settings: negative overscroll {}, using 0", self.overscroll);
            self.overscroll = 0;
        }
        if self.progress_interval < 1 {
            self.progress_interval = defaults.progress_interval;
        }
        if self.fill_stack_capacity < 2 {
            self.fill_stack_capacity = defaults.fill_stack_capacity;
        }
        if self.max_image_size < 1 {
            self.max_image_size = defaults.max_image_size;
        }
        if !(self.min_rotate_scale > 0.0 && self.min_rotate_scale <= self.max_rotate_scale) {
            warn!(
                "settings: bad rotate scale range {}..{}, using defaults",
                self.min_rotate_scale, self.max_rotate_scale
            );
            self.min_rotate_scale = defaults.min_rotate_scale;
            self.max_rotate_scale = defaults.max_rotate_scale;
        }
        if self.history_depth < 1 {
            self.history_depth = defaults.history_depth;
        }
    }

    /// Per-user settings file location.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("rasterkit");
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .unwrap_or_else(|_| {
                    std::env::current_exe()
                        .ok()
                        .and_then(|p| p.parent().map(|d| d.to_string_lossy().into_owned()))
                        .unwrap_or_default()
                });
            return Some(PathBuf::from(appdata).join("rasterkit").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("rasterkit")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }
}
