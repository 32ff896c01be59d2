//! Runtime configuration for the sprite plugin, read from a RON file.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::manager::ron_options;

/// Default location of the config file, relative to the working directory.
pub const CONFIG_PATH: &str = "assets/config/sprite_graph.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load {}: IO error: {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to load {}: Parse error: {message}", file.display())]
    Parse { file: PathBuf, message: String },
}

#[derive(Resource, Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpriteGraphConfig {
    /// Directory that sprite paths are resolved against.
    pub sprite_root: PathBuf,
    /// Seed for per-sprite random edge selection. Unseeded sprites draw
    /// from the thread RNG.
    pub rng_seed: Option<u64>,
    /// Log every fired frame trigger at info level.
    pub log_triggers: bool,
}

impl Default for SpriteGraphConfig {
    fn default() -> Self {
        Self {
            sprite_root: PathBuf::from("assets/sprites"),
            rng_seed: None,
            log_triggers: false,
        }
    }
}

impl SpriteGraphConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            file: path.to_path_buf(),
            source,
        })?;
        ron_options()
            .from_str(&contents)
            .map_err(|e| ConfigError::Parse {
                file: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    /// Other failures are logged and also fall back.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(e) => {
                error!("{}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ron");
        fs::write(
            &path,
            r#"(sprite_root: "data/sprites", rng_seed: 42, log_triggers: true)"#,
        )
        .unwrap();

        let config = SpriteGraphConfig::load(&path).unwrap();
        assert_eq!(config.sprite_root, PathBuf::from("data/sprites"));
        assert_eq!(config.rng_seed, Some(42));
        assert!(config.log_triggers);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ron");
        fs::write(&path, "(rng_seed: 7)").unwrap();

        let config = SpriteGraphConfig::load(&path).unwrap();
        assert_eq!(config.sprite_root, SpriteGraphConfig::default().sprite_root);
        assert_eq!(config.rng_seed, Some(7));
        assert!(!config.log_triggers);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ron");
        fs::write(&path, "(rng_seed: \"lots\")").unwrap();

        let err = SpriteGraphConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.ron"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = SpriteGraphConfig::load_or_default(dir.path().join("absent.ron"));
        assert_eq!(config, SpriteGraphConfig::default());
        assert!(matches!(
            SpriteGraphConfig::load(dir.path().join("absent.ron")),
            Err(ConfigError::Io { .. })
        ));
    }
}
