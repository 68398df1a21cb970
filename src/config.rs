//! Runtime configuration.
//!
//! Every key is optional in the TOML file; missing keys take the defaults
//! below. The Telegram credentials can also come from `QUICKDIC_API` and
//! `QUICKDIC_ID` so they stay out of config files.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::aircrack::DEFAULT_BINARY;
use crate::ledger::ResetPolicy;
use crate::notify::{DEFAULT_TELEGRAM_API, TelegramNotifier};
use crate::session::{DEFAULT_FACE, SessionSettings};

pub const ENV_API: &str = "QUICKDIC_API";
pub const ENV_ID: &str = "QUICKDIC_ID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder scanned for `*.txt` dictionaries.
    pub wordlist_folder: PathBuf,
    /// Append-only log of recovered keys.
    pub cracked_log: PathBuf,
    /// Attempts ledger file.
    pub attempts_db: PathBuf,
    /// Forget attempts once a day so networks get retried.
    pub attempt_once_per_day: bool,
    /// Face shown on the display when a key is found.
    pub face: String,
    /// Telegram bot token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    /// Telegram chat id, written either as a string or a bare integer.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_int"
    )]
    pub id: Option<String>,
    pub aircrack_path: PathBuf,
    pub telegram_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wordlist_folder: PathBuf::from("/home/pi/wordlists/"),
            cracked_log: PathBuf::from("/home/pi/handshakes/cracked.txt"),
            attempts_db: PathBuf::from("/home/pi/handshakes/quickdic_attempts.json"),
            attempt_once_per_day: false,
            face: DEFAULT_FACE.to_string(),
            api: None,
            id: None,
            aircrack_path: PathBuf::from(DEFAULT_BINARY),
            telegram_api_base: DEFAULT_TELEGRAM_API.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrInt {
    Str(String),
    Int(i64),
}

fn string_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match StringOrInt::deserialize(deserializer)? {
        StringOrInt::Str(s) => Some(s),
        StringOrInt::Int(n) => Some(n.to_string()),
    })
}

impl Config {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.load_from_env();
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a config file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn load_from_env(&mut self) {
        if let Ok(api) = std::env::var(ENV_API) {
            if !api.trim().is_empty() {
                self.api = Some(api);
            }
        }
        if let Ok(id) = std::env::var(ENV_ID) {
            if !id.trim().is_empty() {
                self.id = Some(id);
            }
        }
    }

    pub fn reset_policy(&self) -> ResetPolicy {
        ResetPolicy {
            once_per_day: self.attempt_once_per_day,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            wordlist_folder: self.wordlist_folder.clone(),
            face: self.face.clone(),
        }
    }

    /// Telegram notifier, when both credentials are set.
    pub fn telegram(&self) -> Option<TelegramNotifier> {
        TelegramNotifier::from_credentials(
            &self.telegram_api_base,
            self.api.as_deref(),
            self.id.as_deref(),
        )
    }
}
