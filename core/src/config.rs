use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{ClientConfig, DEFAULT_BASE_URL};
use crate::model::PrinterId;
use crate::scheduler::{
    Intervals, ADAPT_INTERVAL_SECS, FAST_INTERVAL_SECS, SLOW_INTERVAL_SECS,
};
use crate::{targets, Error};

pub const PRINTER_UUID_VAR: &str = "PRINTER_UUID";
pub const SESSION_ID_VAR: &str = "SESSION_ID";
pub const CONFIG_PATH_VAR: &str = "PRINTDASH_CONFIG";
pub const LOG_LEVEL_VAR: &str = "PRINTDASH_LOG";
pub const DEFAULT_CONFIG_PATH: &str = "printdash.ron";

#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn cookie_header(&self) -> String {
        format!("SESSID=\"{}\"", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub base_url: String,
    pub fast_interval_secs: u64,
    pub slow_interval_secs: u64,
    pub adapt_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub jobs_limit: u32,
    pub files_limit: u32,
    pub events_limit: u32,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fast_interval_secs: FAST_INTERVAL_SECS,
            slow_interval_secs: SLOW_INTERVAL_SECS,
            adapt_interval_secs: ADAPT_INTERVAL_SECS,
            request_timeout_secs: 10,
            jobs_limit: 5,
            files_limit: 5,
            events_limit: 5,
        }
    }
}

impl DashConfig {
    pub fn from_ron(path: &str, text: &str) -> Result<Self, Error> {
        let config: DashConfig = ron::from_str(text).map_err(|error| Error::ConfigFile {
            path: path.to_string(),
            details: error.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let label = path.display().to_string();
        match fs::read_to_string(path) {
            Ok(text) => {
                debug!(target: targets::CONFIG, path = %label, "Loading config file");
                Self::from_ron(&label, &text)
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(target: targets::CONFIG, path = %label, "No config file, using defaults");
                Ok(Self::default())
            }
            Err(error) => Err(Error::ConfigFile {
                path: label,
                details: error.to_string(),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let nonzero = [
            ("fast_interval_secs", self.fast_interval_secs),
            ("slow_interval_secs", self.slow_interval_secs),
            ("adapt_interval_secs", self.adapt_interval_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ];
        for (key, value) in nonzero {
            if value == 0 {
                return Err(Error::Config {
                    key: key.to_string(),
                    details: "must be greater than zero".to_string(),
                });
            }
        }

        if self.fast_interval_secs > self.slow_interval_secs {
            return Err(Error::Config {
                key: "fast_interval_secs".to_string(),
                details: format!(
                    "{} exceeds slow_interval_secs {}",
                    self.fast_interval_secs, self.slow_interval_secs
                ),
            });
        }

        if self.base_url.trim().is_empty() {
            return Err(Error::Config {
                key: "base_url".to_string(),
                details: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn intervals(&self) -> Intervals {
        Intervals {
            fast: Duration::from_secs(self.fast_interval_secs),
            slow: Duration::from_secs(self.slow_interval_secs),
            adapt: Duration::from_secs(self.adapt_interval_secs),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub printer: PrinterId,
    pub session: SessionToken,
    pub dash: DashConfig,
    pub config_path: PathBuf,
}

impl Settings {
    pub fn load() -> Result<Self, Error> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(target: targets::CONFIG, path = %path.display(), "Loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let printer = PrinterId::new(required(&lookup, PRINTER_UUID_VAR)?);
        let session = SessionToken::new(required(&lookup, SESSION_ID_VAR)?);
        let config_path = lookup(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let dash = DashConfig::load(&config_path)?;

        info!(
            target: targets::CONFIG,
            printer = %printer,
            base_url = %dash.base_url,
            config = %config_path.display(),
            "Settings loaded"
        );

        Ok(Self {
            printer,
            session,
            dash,
            config_path,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, Error> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Config {
            key: key.to_string(),
            details: "missing or empty".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_session_is_config_error() {
        let lookup = lookup_from(&[(PRINTER_UUID_VAR, "abc-123")]);
        let error = Settings::from_lookup(lookup).expect_err("missing session");
        match error {
            Error::Config { key, .. } => assert_eq!(key, SESSION_ID_VAR),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn settings_fall_back_to_defaults_without_file() {
        let lookup = lookup_from(&[
            (PRINTER_UUID_VAR, " abc-123 "),
            (SESSION_ID_VAR, "token"),
            (CONFIG_PATH_VAR, "does-not-exist/printdash.ron"),
        ]);
        let settings = Settings::from_lookup(lookup).expect("settings");
        assert_eq!(settings.printer.expose(), "abc-123");
        assert_eq!(settings.dash, DashConfig::default());
        assert_eq!(settings.dash.intervals(), Intervals::default());
    }

    #[test]
    fn ron_overrides_selected_fields() {
        let config = DashConfig::from_ron(
            "printdash.ron",
            "(fast_interval_secs: 3, jobs_limit: 10)",
        )
        .expect("config");
        assert_eq!(config.fast_interval_secs, 3);
        assert_eq!(config.jobs_limit, 10);
        assert_eq!(config.slow_interval_secs, SLOW_INTERVAL_SECS);
    }

    #[test]
    fn fast_slower_than_slow_is_rejected() {
        let error = DashConfig::from_ron(
            "printdash.ron",
            "(fast_interval_secs: 90, slow_interval_secs: 60)",
        )
        .expect_err("invalid");
        assert!(matches!(error, Error::Config { .. }));
    }

    #[test]
    fn session_token_is_hidden_from_debug() {
        let token = SessionToken::new("s3cr3t");
        assert_eq!(format!("{token:?}"), "SessionToken(***)");
        assert_eq!(token.cookie_header(), "SESSID=\"s3cr3t\"");
    }
}
