// ⚙️ Configuration
//
// Optional TOML file plus environment overrides. Missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "study-review.toml";

pub const ENV_DB: &str = "STUDY_REVIEW_DB";
pub const ENV_ADDR: &str = "STUDY_REVIEW_ADDR";
pub const ENV_ACTOR: &str = "STUDY_REVIEW_ACTOR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding cards and the review log
    pub database_path: PathBuf,

    /// JSON deck imported by `init` when no --seed is given
    pub seed_path: Option<PathBuf>,

    /// Bind address for the REST server
    pub server_addr: String,

    /// Recorded on every review event
    pub actor: String,

    /// How many cards the "recent activity" view shows
    pub recent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("study_review.db"),
            seed_path: None,
            server_addr: "0.0.0.0:3000".to_string(),
            actor: "learner".to_string(),
            recent_limit: 3,
        }
    }
}

impl Config {
    /// Parse a TOML file; absent keys take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Load `path` (or the default file if it exists), then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Config::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Config::from_file(DEFAULT_CONFIG_FILE)?,
            None => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        log::debug!("configuration: {:?}", config);
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DB) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(addr) = lookup(ENV_ADDR) {
            self.server_addr = addr;
        }
        if let Some(actor) = lookup(ENV_ACTOR) {
            self.actor = actor;
        }
    }
}
