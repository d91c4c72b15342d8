use crate::controller::SessionConfig;
use crate::policy::TypingPolicy;
use crate::time_series::{DEFAULT_SMOOTHING_TAU_SECS, DEFAULT_WINDOW_SECS};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user preferences for the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub time_limit_secs: Option<f64>,
    pub policy: TypingPolicy,
    pub window_secs: f64,
    pub smoothing_tau_secs: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_limit_secs: None,
            policy: TypingPolicy::Normal,
            window_secs: DEFAULT_WINDOW_SECS,
            smoothing_tau_secs: Some(DEFAULT_SMOOTHING_TAU_SECS),
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            time_limit_secs: cfg.time_limit_secs,
            policy: cfg.policy,
            window_secs: cfg.window_secs,
            smoothing_tau_secs: cfg.smoothing_tau_secs,
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
        let path = if let Some(pd) = ProjectDirs::from("", "", "keydrill") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("keydrill_config.json")
        };
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
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
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
