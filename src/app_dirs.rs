use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "spotr";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/spotr`, falling back to the platform data dir
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("scores.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("spotr.log"))
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|pd| pd.config_dir().join("config.json"))
    }
}
