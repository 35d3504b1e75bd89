use crate::controller::DEFAULT_ZOOM;
use crate::types::Coords;
use anyhow::{Context, Result};
use dirs_next as dirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const POSITION_ENV: &str = "WORKMAP_POSITION";
const APP_DIR: &str = "workmap";
const DB_FILE: &str = "workouts.sqlite3";

/// User preferences kept as JSON under the platform config dir.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// SQLite file holding saved workouts. `None` uses the platform data dir.
    pub database: Option<PathBuf>,
    /// Fallback position used when none is given on the command line.
    pub home: Option<Coords>,
    pub zoom: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            home: None,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl Settings {
    const FILE: &'static str = "settings.json";

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join(Self::FILE))
    }

    /// Missing file means defaults. A file that cannot be parsed is logged
    /// and ignored.
    pub fn load(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&data) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), err = %e, "ignoring unreadable settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating dir: {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self).context("serializing settings")?;
        fs::write(path, data).with_context(|| format!("writing settings: {}", path.display()))?;
        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join(DB_FILE)
        })
    }

    /// `flag` beats the `WORKMAP_POSITION` env var, which beats `home`.
    pub fn resolve_position(&self, flag: Option<Coords>) -> Option<Coords> {
        flag.or_else(|| position_from_env(std::env::var(POSITION_ENV).ok().as_deref()))
            .or(self.home)
    }
}

fn position_from_env(value: Option<&str>) -> Option<Coords> {
    let raw = value?;
    match raw.parse() {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::warn!(var = POSITION_ENV, err = %e, "ignoring position from env");
            None
        }
    }
}
