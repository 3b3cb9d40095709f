use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::layout::Breakpoints;

const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "flipbook";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Tunables of one viewer instance. Read-only; never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub breakpoints: Breakpoints,

    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: u64,

    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// Pages rendered before the book is constructed
    #[serde(default = "default_initial_pages")]
    pub initial_pages: usize,

    #[serde(default = "default_lazy_behind")]
    pub lazy_behind: usize,

    #[serde(default = "default_lazy_ahead")]
    pub lazy_ahead: usize,

    #[serde(default = "default_initial_quality")]
    pub initial_quality: f32,

    #[serde(default = "default_lazy_quality")]
    pub lazy_quality: f32,

    #[serde(default = "default_thumbnail_quality")]
    pub thumbnail_quality: f32,

    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,

    #[serde(default = "default_zoom_scale")]
    pub zoom_scale: f32,

    #[serde(default = "default_min_zoom")]
    pub min_zoom: f32,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: f32,

    /// Pinch ending at or below this scale snaps back to 1x
    #[serde(default = "default_pinch_reset")]
    pub pinch_reset_threshold: f32,

    #[serde(default = "default_double_tap_ms")]
    pub double_tap_ms: u64,

    #[serde(default = "default_swipe_distance")]
    pub swipe_distance: f32,

    #[serde(default = "default_corner_zone")]
    pub corner_zone: f32,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    #[serde(default = "default_initial_render_timeout_ms")]
    pub initial_render_timeout_ms: u64,
}

fn default_resize_debounce_ms() -> u64 {
    150
}

fn default_ready_timeout_ms() -> u64 {
    10_000
}

fn default_initial_pages() -> usize {
    3
}

fn default_lazy_behind() -> usize {
    2
}

fn default_lazy_ahead() -> usize {
    4
}

fn default_initial_quality() -> f32 {
    0.82
}

fn default_lazy_quality() -> f32 {
    0.88
}

fn default_thumbnail_quality() -> f32 {
    0.5
}

fn default_thumbnail_width() -> u32 {
    90
}

fn default_zoom_scale() -> f32 {
    2.2
}

fn default_min_zoom() -> f32 {
    1.0
}

fn default_max_zoom() -> f32 {
    3.0
}

fn default_pinch_reset() -> f32 {
    1.05
}

fn default_double_tap_ms() -> u64 {
    300
}

fn default_swipe_distance() -> f32 {
    50.0
}

fn default_corner_zone() -> f32 {
    80.0
}

fn default_workers() -> usize {
    crate::pdf::DEFAULT_WORKERS
}

fn default_cache_size() -> usize {
    crate::pdf::DEFAULT_CACHE_SIZE
}

fn default_initial_render_timeout_ms() -> u64 {
    30_000
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            breakpoints: Breakpoints::default(),
            resize_debounce_ms: default_resize_debounce_ms(),
            ready_timeout_ms: default_ready_timeout_ms(),
            initial_pages: default_initial_pages(),
            lazy_behind: default_lazy_behind(),
            lazy_ahead: default_lazy_ahead(),
            initial_quality: default_initial_quality(),
            lazy_quality: default_lazy_quality(),
            thumbnail_quality: default_thumbnail_quality(),
            thumbnail_width: default_thumbnail_width(),
            zoom_scale: default_zoom_scale(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            pinch_reset_threshold: default_pinch_reset(),
            double_tap_ms: default_double_tap_ms(),
            swipe_distance: default_swipe_distance(),
            corner_zone: default_corner_zone(),
            workers: default_workers(),
            cache_size: default_cache_size(),
            initial_render_timeout_ms: default_initial_render_timeout_ms(),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_yaml::from_str::<Self>(&content).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        debug!("Loaded viewer config from {path:?}");
        Ok(config.sanitized())
    }

    /// Load `path` if given (else the default location), falling back to
    /// defaults on any failure
    #[must_use]
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Self::default(),
            },
        };
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Repair values that would make the viewer misbehave
    #[must_use]
    fn sanitized(mut self) -> Self {
        if !self.min_zoom.is_finite()
            || !self.max_zoom.is_finite()
            || self.min_zoom < 1.0
            || self.max_zoom < self.min_zoom
        {
            warn!(
                "Invalid zoom bounds [{}, {}], using defaults",
                self.min_zoom, self.max_zoom
            );
            self.min_zoom = default_min_zoom();
            self.max_zoom = default_max_zoom();
        }
        if !self.zoom_scale.is_finite() {
            warn!("Invalid zoom scale {}, using default", self.zoom_scale);
            self.zoom_scale = default_zoom_scale();
        }
        self.zoom_scale = self.zoom_scale.clamp(self.min_zoom, self.max_zoom);
        self.workers = self.workers.max(1);
        self
    }

    #[must_use]
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    #[must_use]
    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_ms)
    }

    #[must_use]
    pub fn initial_render_timeout(&self) -> Duration {
        Duration::from_millis(self.initial_render_timeout_ms)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{}}").unwrap();

        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "lazy_ahead: 6\nbreakpoints:\n  mobile: 400").unwrap();

        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.lazy_ahead, 6);
        assert_eq!(config.breakpoints.mobile, 400);
        assert_eq!(config.breakpoints.tablet, 768);
        assert_eq!(config.lazy_behind, 2);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "lazy_ahead: [not a number").unwrap();

        assert!(matches!(
            ViewerConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(
            ViewerConfig::load_or_default(Some(file.path())),
            ViewerConfig::default()
        );
    }

    #[test]
    fn invalid_zoom_bounds_are_repaired() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_zoom: 0.5\nmax_zoom: 0.2\nzoom_scale: 9").unwrap();

        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.min_zoom, 1.0);
        assert_eq!(config.max_zoom, 3.0);
        assert_eq!(config.zoom_scale, 3.0);
    }

    #[test]
    fn non_finite_zoom_values_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_zoom: .nan\nmax_zoom: 4.0\nzoom_scale: .nan").unwrap();

        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.min_zoom, 1.0);
        assert_eq!(config.max_zoom, 3.0);
        assert_eq!(config.zoom_scale, 2.2);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_zoom: .inf").unwrap();
        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.max_zoom, 3.0);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ViewerConfig::load(&dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
