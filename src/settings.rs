//! Settings persistence.
//!
//! Settings hold the account identifier and app password. Loading a store
//! that has never been written yields empty defaults.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::mask_secret;
use crate::crypto::{decrypt_secret, encrypt_secret, is_encryption_configured};
use crate::error::SettingsError;
use crate::session::Credentials;

/// User settings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub identifier: String,
    pub secret: String,
}

impl Settings {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Settings {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.identifier, &self.secret)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("identifier", &self.identifier)
            .field("secret", &mask_secret(&self.secret))
            .finish()
    }
}

/// Loads and saves [`Settings`].
pub trait SettingsStore: Send + Sync {
    /// Stored settings, or defaults when nothing was saved yet.
    fn load(&self) -> Result<Settings, SettingsError>;

    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// On-disk layout of the settings file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    #[serde(default)]
    identifier: String,
    #[serde(default)]
    secret: String,
    #[serde(default)]
    secret_encrypted: bool,
}

/// Settings kept in a JSON file.
///
/// The secret is encrypted when `SKYTHREAD_ENCRYPTION_KEY` is set at save
/// time; otherwise it is written as-is and a warning is logged.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSettingsStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        if !self.path.exists() {
            info!(
                "No settings file at {}, using defaults",
                self.path.display()
            );
            return Ok(Settings::default());
        }

        debug!("Loading settings from {}", self.path.display());
        let raw = fs::read_to_string(&self.path)?;
        let stored: StoredSettings = serde_json::from_str(&raw)?;

        let secret = if stored.secret_encrypted && !stored.secret.is_empty() {
            decrypt_secret(&stored.secret).map_err(|e| SettingsError::Crypto(e.to_string()))?
        } else {
            stored.secret
        };

        Ok(Settings {
            identifier: stored.identifier,
            secret,
        })
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let (secret, secret_encrypted) = if settings.secret.is_empty() {
            (String::new(), false)
        } else if is_encryption_configured() {
            let encrypted = encrypt_secret(&settings.secret)
                .map_err(|e| SettingsError::Crypto(e.to_string()))?;
            (encrypted, true)
        } else {
            warn!("No encryption key configured - storing the app password unencrypted");
            (settings.secret.clone(), false)
        };

        let stored = StoredSettings {
            identifier: settings.identifier.clone(),
            secret,
            secret_encrypted,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

/// Settings kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        MemorySettingsStore {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        match self.settings.lock() {
            Ok(settings) => Ok(settings.clone()),
            Err(poisoned) => Ok(poisoned.into_inner().clone()),
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        match self.settings.lock() {
            Ok(mut stored) => *stored = settings.clone(),
            Err(poisoned) => *poisoned.into_inner() = settings.clone(),
        }
        Ok(())
    }
}
