use crate::app_dirs::AppDirs;
use crate::catalog::{ChallengeCatalog, DEFAULT_CHALLENGES};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Constants fixed for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub catalog: Vec<String>,
    /// Units per second, in play-area coordinates.
    pub fall_velocity: f64,
    pub starting_lives: u32,
    pub confidence_threshold: f64,
    pub pop_duration_secs: f64,
    pub tick_rate_hz: u32,
    pub play_width: f64,
    pub play_height: f64,
    pub sprite_extent: f64,
    /// Begin directly in the active phase, without a start screen.
    pub skip_start_screen: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            catalog: DEFAULT_CHALLENGES.iter().map(|s| s.to_string()).collect(),
            fall_velocity: 240.0,
            starting_lives: 3,
            confidence_threshold: 0.85,
            pop_duration_secs: 0.2,
            tick_rate_hz: 30,
            play_width: 360.0,
            play_height: 640.0,
            sprite_extent: 80.0,
            skip_start_screen: false,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<ChallengeCatalog, ConfigError> {
        let catalog = ChallengeCatalog::new(self.catalog.iter().cloned())?;

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.starting_lives == 0 {
            return Err(ConfigError::Invalid("starting_lives must be at least 1".into()));
        }
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("tick_rate_hz must be positive".into()));
        }
        for (name, value) in [
            ("fall_velocity", self.fall_velocity),
            ("pop_duration_secs", self.pop_duration_secs),
            ("play_width", self.play_width),
            ("play_height", self.play_height),
            ("sprite_extent", self.sprite_extent),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.sprite_extent > self.play_width || self.sprite_extent > self.play_height {
            return Err(ConfigError::Invalid(
                "sprite_extent must fit inside the play area".into(),
            ));
        }

        Ok(catalog)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }

    pub fn tick_secs(&self) -> f64 {
        self.tick_interval().as_secs_f64()
    }
}

pub trait ConfigStore {
    fn load(&self) -> GameConfig;
    fn save(&self, cfg: &GameConfig) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("facedrop_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> GameConfig {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return GameConfig::default(),
        };
        match serde_json::from_slice::<GameConfig>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unparsable config");
                GameConfig::default()
            }
        }
    }

    fn save(&self, cfg: &GameConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = GameConfig::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = GameConfig {
            catalog: vec!["smile".into(), "frown".into()],
            fall_velocity: 120.0,
            starting_lives: 5,
            confidence_threshold: 0.7,
            pop_duration_secs: 0.5,
            tick_rate_hz: 60,
            play_width: 800.0,
            play_height: 600.0,
            sprite_extent: 64.0,
            skip_start_screen: true,
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn missing_or_garbage_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), GameConfig::default());

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(store.load(), GameConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "starting_lives": 9 }"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.starting_lives, 9);
        assert_eq!(cfg.confidence_threshold, 0.85);
    }

    #[test]
    fn validate_accepts_defaults() {
        let catalog = GameConfig::default().validate().unwrap();
        assert_eq!(catalog.len(), 7);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad = [
            GameConfig {
                confidence_threshold: 1.5,
                ..Default::default()
            },
            GameConfig {
                starting_lives: 0,
                ..Default::default()
            },
            GameConfig {
                tick_rate_hz: 0,
                ..Default::default()
            },
            GameConfig {
                fall_velocity: -1.0,
                ..Default::default()
            },
            GameConfig {
                pop_duration_secs: 0.0,
                ..Default::default()
            },
            GameConfig {
                sprite_extent: 1000.0,
                ..Default::default()
            },
        ];
        for cfg in bad {
            assert_matches!(cfg.validate(), Err(ConfigError::Invalid(_)));
        }
    }

    #[test]
    fn validate_rejects_bad_catalog() {
        let cfg = GameConfig {
            catalog: vec![],
            ..Default::default()
        };
        assert_matches!(cfg.validate(), Err(ConfigError::Catalog(_)));
    }

    #[test]
    fn tick_interval_follows_rate() {
        let cfg = GameConfig {
            tick_rate_hz: 50,
            ..Default::default()
        };
        assert_eq!(cfg.tick_interval(), Duration::from_millis(20));
    }
}
