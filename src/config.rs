//! On-disk configuration under `~/.tablero/`.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the app needs to reach the remote, plus cached credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Base URL of the remote store, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub store_url: String,
    /// Public anon key for the remote store.
    #[serde(default)]
    pub store_key: String,
    /// Access token from the last sign-in, if still around.
    #[serde(default)]
    pub session_token: Option<String>,
    /// Google OAuth token for the calendar/drive sync, with its expiry.
    #[serde(default)]
    pub google_token: Option<String>,
    #[serde(default)]
    pub google_token_expiry: Option<DateTime<Utc>>,
}

impl Config {
    /// Load from JSON, starting fresh on a missing or unreadable file.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("config ilegible, usando valores por defecto: {e}");
                    Config::default()
                }
            },
            Err(e) => {
                log::warn!("no se pudo leer la configuración: {e}");
                Config::default()
            }
        }
    }

    /// Save as JSON using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Environment variables beat the file, so scripts can point elsewhere
    /// without touching it.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("TABLERO_URL") {
            self.store_url = url;
        }
        if let Ok(key) = std::env::var("TABLERO_KEY") {
            self.store_key = key;
        }
    }

    pub fn has_store(&self) -> bool {
        !self.store_url.is_empty() && !self.store_key.is_empty()
    }
}

/// `~/.tablero/config.json`, with `.` standing in when HOME is unset.
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".tablero").join("config.json")
}
