use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::{EngineError, EngineResult};
use crate::session::SessionConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub total_rounds: u32,
    pub round_secs: f64,
    pub pool_size: u32,
    pub canvas_size: f64,
    /// Directory holding `annotation/` and `images/`; synthetic scans when unset
    pub content_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub player_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            total_rounds: crate::TOTAL_ROUNDS,
            round_secs: crate::ROUND_SECS,
            pool_size: crate::ROUND_POOL_SIZE,
            canvas_size: crate::DEFAULT_CANVAS_SIZE,
            content_dir: None,
            seed: None,
            player_name: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |reason: String| Err(EngineError::InvalidConfig(reason));

        if self.total_rounds == 0 {
            return invalid("a session needs at least one round".into());
        }
        if self.pool_size <= self.total_rounds {
            return invalid(format!(
                "scan pool of {} is too small for {} rounds",
                self.pool_size, self.total_rounds
            ));
        }
        if !(self.round_secs.is_finite() && self.round_secs > 0.0) {
            return invalid(format!("round length must be positive, got {}", self.round_secs));
        }
        if !(self.canvas_size.is_finite() && self.canvas_size > 0.0) {
            return invalid(format!("canvas size must be positive, got {}", self.canvas_size));
        }
        Ok(())
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            total_rounds: self.total_rounds,
            pool_size: self.pool_size,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("spotr_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring unreadable config {}: {e}", self.path.display()),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
