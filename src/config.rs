use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::credential::TOKEN_KEY;
use crate::error::{AppError, AppResult};

const APP_DIR_NAME: &str = "ticketdesk";
const CONFIG_FILE_NAME: &str = "config.toml";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_SIGNIN_URL: &str = "http://localhost:3000/signin";
pub const DEFAULT_APP_URL: &str = "http://localhost:3006/tickets/";

pub fn config_directory() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| AppError::Configuration("cannot determine config directory".to_string()))
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

/// Settings persisted by `ticketdesk config init`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    pub api_base_url: Option<String>,
    pub contacts_base_url: Option<String>,
    pub contacts_token_key: Option<String>,
    pub signin_url: Option<String>,
    pub app_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: Url,
    pub contacts_base_url: Url,
    pub contacts_token_key: String,
    pub signin_url: Url,
    pub app_url: String,
    pub timeout: Option<Duration>,
}

impl AppConfig {
    /// Defaults, overlaid by the stored file, overlaid by the environment.
    pub fn load() -> AppResult<Self> {
        let stored = StoredConfig::load()?;
        Self::resolve(stored, |name| env::var(name).ok())
    }

    pub fn resolve(
        stored: StoredConfig,
        env_var: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let pick = |name: &str, stored: Option<String>| {
            env_var(name)
                .filter(|value| !value.trim().is_empty())
                .or(stored)
                .filter(|value| !value.trim().is_empty())
        };

        let api_base_url = pick("TICKETDESK_API_BASE_URL", stored.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let contacts_base_url = pick("TICKETDESK_CONTACTS_BASE_URL", stored.contacts_base_url)
            .unwrap_or_else(|| api_base_url.clone());
        let contacts_token_key = pick("TICKETDESK_CONTACTS_TOKEN_KEY", stored.contacts_token_key)
            .unwrap_or_else(|| TOKEN_KEY.to_string());
        let signin_url = pick("TICKETDESK_SIGNIN_URL", stored.signin_url)
            .unwrap_or_else(|| DEFAULT_SIGNIN_URL.to_string());
        let app_url = pick("TICKETDESK_APP_URL", stored.app_url)
            .unwrap_or_else(|| DEFAULT_APP_URL.to_string());

        let timeout_secs = match env_var("TICKETDESK_TIMEOUT_SECS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                AppError::Configuration(format!("TICKETDESK_TIMEOUT_SECS is not a number: {raw}"))
            })?),
            None => stored.timeout_secs,
        };

        Ok(Self {
            api_base_url: parse_url("API base URL", &api_base_url)?,
            contacts_base_url: parse_url("contacts base URL", &contacts_base_url)?,
            contacts_token_key: contacts_token_key.trim().to_string(),
            signin_url: parse_url("sign-in URL", &signin_url)?,
            app_url: parse_url("app URL", &app_url)?.to_string(),
            timeout: timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs),
        })
    }
}

fn parse_url(label: &str, value: &str) -> AppResult<Url> {
    Url::parse(value.trim())
        .map_err(|err| AppError::Configuration(format!("invalid {label} '{value}': {err}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn falls_back_to_defaults() {
        let config = AppConfig::resolve(StoredConfig::default(), env_from(&[])).unwrap();
        assert_eq!(config.api_base_url.as_str(), DEFAULT_API_BASE_URL);
        assert_eq!(config.contacts_base_url, config.api_base_url);
        assert_eq!(config.contacts_token_key, "token");
        assert_eq!(config.signin_url.as_str(), DEFAULT_SIGNIN_URL);
        assert_eq!(config.app_url, DEFAULT_APP_URL);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn environment_overrides_stored_values() {
        let stored = StoredConfig {
            api_base_url: Some("https://stored.example.com/api".to_string()),
            contacts_base_url: Some("https://crm.example.com/api".to_string()),
            timeout_secs: Some(5),
            ..StoredConfig::default()
        };
        let env = env_from(&[
            ("TICKETDESK_API_BASE_URL", "https://env.example.com/api"),
            ("TICKETDESK_TIMEOUT_SECS", "30"),
        ]);
        let config = AppConfig::resolve(stored, env).unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://env.example.com/api");
        assert_eq!(
            config.contacts_base_url.as_str(),
            "https://crm.example.com/api"
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_invalid_urls() {
        let env = env_from(&[("TICKETDESK_SIGNIN_URL", "not a url")]);
        let err = AppConfig::resolve(StoredConfig::default(), env).unwrap_err();
        assert!(matches!(err, AppError::Configuration(message) if message.contains("sign-in URL")));
    }

    #[test]
    fn stored_config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticketdesk").join(CONFIG_FILE_NAME);
        assert_eq!(StoredConfig::load_from(&path).unwrap(), StoredConfig::default());

        let stored = StoredConfig {
            signin_url: Some("https://signin.example.com".to_string()),
            timeout_secs: Some(10),
            ..StoredConfig::default()
        };
        stored.save_to(&path).unwrap();
        assert_eq!(StoredConfig::load_from(&path).unwrap(), stored);
    }
}
