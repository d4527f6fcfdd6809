use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::results::PollTiming;

const APP_DIR: &str = "rehearsal";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            static_dir: PathBuf::from("public"),
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeSettings {
    pub free_take_limit: u32,
    pub booking_url: String,
}

impl Default for TakeSettings {
    fn default() -> Self {
        Self {
            free_take_limit: 3,
            booking_url: "https://example.com/book-a-review".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsSettings {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub watchdog_ms: u64,
}

impl Default for ResultsSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: 1800,
            max_delay_ms: 3200,
            watchdog_ms: 6000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailingListSettings {
    pub api_key: Option<String>,
    pub audience_id: Option<String>,
    pub tag: Option<String>,
}

impl Default for MailingListSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            audience_id: None,
            tag: Some("GTK_Rehearsal".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub base_url: String,
    /// SQLite file holding take counters. `None` uses the config directory.
    pub store_path: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".into(),
            store_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub takes: TakeSettings,
    pub results: ResultsSettings,
    pub mailing_list: MailingListSettings,
    pub client: ClientSettings,
}

impl AppSettings {
    /// Reads settings from `path`, writing defaults there first if it is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save(path)?;
            return Ok(settings);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let base = dirs::config_dir().context("No config directory on this platform")?;
        Ok(base.join(APP_DIR))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(SETTINGS_FILE))
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.client.store_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("takes.db")),
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("MAILCHIMP_API_KEY") {
            self.mailing_list.api_key = Some(key);
        }
        if let Some(audience) = get("MAILCHIMP_AUDIENCE_ID") {
            self.mailing_list.audience_id = Some(audience);
        }
        if let Some(tag) = get("MAILCHIMP_TAG") {
            self.mailing_list.tag = Some(tag);
        }
        if let Some(addr) = get("REHEARSAL_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(url) = get("REHEARSAL_BASE_URL") {
            self.client.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let results = &self.results;
        if results.min_delay_ms >= results.max_delay_ms {
            bail!(
                "results.min_delay_ms ({}) must be below results.max_delay_ms ({})",
                results.min_delay_ms,
                results.max_delay_ms
            );
        }
        if results.watchdog_ms == 0 {
            bail!("results.watchdog_ms must be positive");
        }
        if self.takes.free_take_limit == 0 {
            bail!("takes.free_take_limit must be at least 1");
        }
        url::Url::parse(&self.client.base_url)
            .with_context(|| format!("client.base_url is not a URL: {}", self.client.base_url))?;
        Ok(())
    }

    pub fn poll_timing(&self) -> PollTiming {
        PollTiming {
            min_delay: Duration::from_millis(self.results.min_delay_ms),
            max_delay: Duration::from_millis(self.results.max_delay_ms),
            watchdog: Duration::from_millis(self.results.watchdog_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = AppSettings::load(&path).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert!(path.exists());
        assert_eq!(settings.takes.free_take_limit, 3);
        assert_eq!(settings.poll_timing(), PollTiming::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "server": { "bind_addr": "0.0.0.0:8080" } }"#).unwrap();

        let settings = AppSettings::load(&path).unwrap();
        assert_eq!(settings.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(settings.server.static_dir, PathBuf::from("public"));
        assert_eq!(settings.results.watchdog_ms, 6000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(AppSettings::load(&path).is_err());
    }

    #[test]
    fn env_overrides_replace_non_empty_values() {
        let vars: HashMap<&str, &str> = [
            ("MAILCHIMP_API_KEY", "abc-us1"),
            ("MAILCHIMP_AUDIENCE_ID", "aud"),
            ("MAILCHIMP_TAG", "  "),
            ("REHEARSAL_BASE_URL", "http://localhost:9000"),
        ]
        .into_iter()
        .collect();

        let mut settings = AppSettings::default();
        settings.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.mailing_list.api_key.as_deref(), Some("abc-us1"));
        assert_eq!(settings.mailing_list.audience_id.as_deref(), Some("aud"));
        assert_eq!(settings.mailing_list.tag.as_deref(), Some("GTK_Rehearsal"));
        assert_eq!(settings.client.base_url, "http://localhost:9000");
        assert_eq!(settings.server.bind_addr, "127.0.0.1:3000");
    }

    #[test]
    fn validation_rejects_inverted_delays() {
        let mut settings = AppSettings::default();
        assert!(settings.validate().is_ok());

        settings.results.min_delay_ms = 3200;
        assert!(settings.validate().is_err());

        let mut settings = AppSettings::default();
        settings.client.base_url = "not a url".into();
        assert!(settings.validate().is_err());
    }
}
