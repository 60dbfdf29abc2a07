//! Application settings.

use std::path::PathBuf;
use std::time::Duration;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "webharvest.db";

/// Default crawl-definitions subdirectory name.
const CONFIGS_SUBDIR: &str = "configs";

/// Default downloads subdirectory name.
const DOWNLOADS_SUBDIR: &str = "downloads";

/// Default delay between requests to one domain, in milliseconds.
const DEFAULT_REQUEST_DELAY_MS: u64 = 5000;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename under the data directory.
    pub database_filename: String,
    /// Explicit database path override (`WEBHARVEST_DB`).
    pub database_override: Option<PathBuf>,
    /// Directory of crawl definitions.
    pub configs_dir: PathBuf,
    /// Directory fetched payloads are stored under.
    pub downloads_dir: PathBuf,
    /// Delay between requests to one domain, in milliseconds.
    pub request_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/harvest/ for user data.
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("harvest");

        Self {
            configs_dir: data_dir.join(CONFIGS_SUBDIR),
            downloads_dir: data_dir.join(DOWNLOADS_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_override: None,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
        }
    }
}

impl Settings {
    /// Create settings rooted at a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            configs_dir: data_dir.join(CONFIGS_SUBDIR),
            downloads_dir: data_dir.join(DOWNLOADS_SUBDIR),
            data_dir,
            ..Default::default()
        }
    }

    /// Settings from the environment (after `.env` loading):
    /// `WEBHARVEST_DATA_DIR`, `WEBHARVEST_CONFIGS_DIR`, `WEBHARVEST_DB`,
    /// `WEBHARVEST_DELAY_MS`. Tilde paths expand.
    pub fn from_env() -> Self {
        let mut settings = match std::env::var("WEBHARVEST_DATA_DIR") {
            Ok(dir) => Self::with_data_dir(expand(&dir)),
            Err(_) => Self::default(),
        };

        if let Ok(dir) = std::env::var("WEBHARVEST_CONFIGS_DIR") {
            settings.configs_dir = expand(&dir);
        }
        settings.apply_env_overrides();
        settings
    }

    /// Apply the non-directory env overrides (`WEBHARVEST_DB`,
    /// `WEBHARVEST_DELAY_MS`). Directory roots are the caller's decision.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("WEBHARVEST_DB") {
            self.database_override = Some(expand(&path));
        }
        if let Ok(delay) = std::env::var("WEBHARVEST_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                self.request_delay_ms = ms;
            }
        }
    }

    /// Full path to the ledger database.
    pub fn database_path(&self) -> PathBuf {
        self.database_override
            .clone()
            .unwrap_or_else(|| self.data_dir.join(&self.database_filename))
    }

    /// Per-domain request delay.
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
