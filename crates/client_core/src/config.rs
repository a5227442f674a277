use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use shared::domain::SiteVariant;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "reserve.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub site: SiteVariant,
    pub csrf_token: Option<String>,
    /// No timeout unless configured; the transport default applies.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            site: SiteVariant::Marketing,
            csrf_token: None,
            request_timeout_secs: None,
        }
    }
}

impl ClientSettings {
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(self.server_url.trim())
            .with_context(|| format!("invalid server url '{}'", self.server_url))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Defaults, then `reserve.toml` in the working directory, then environment.
pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> Result<ClientSettings> {
    let file_cfg = match fs::read_to_string(path) {
        Ok(raw) => Some(
            toml::from_str::<HashMap<String, toml::Value>>(&raw)
                .with_context(|| format!("failed to parse '{}'", path.display()))?,
        ),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    merge_settings(file_cfg.as_ref(), |key| std::env::var(key).ok())
}

fn merge_settings(
    file_cfg: Option<&HashMap<String, toml::Value>>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    if let Some(file_cfg) = file_cfg {
        if let Some(v) = file_value(file_cfg, "server_url") {
            settings.server_url = v;
        }
        if let Some(v) = file_value(file_cfg, "site") {
            settings.site = v.parse()?;
        }
        if let Some(v) = file_value(file_cfg, "csrf_token") {
            settings.csrf_token = Some(v);
        }
        if let Some(v) = file_value(file_cfg, "request_timeout_secs") {
            settings.request_timeout_secs = Some(parse_secs(&v)?);
        }
    }

    if let Some(v) = env("RESERVE_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SITE") {
        settings.site = v.parse()?;
    }
    if let Some(v) = env("APP__CSRF_TOKEN") {
        settings.csrf_token = Some(v);
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = Some(parse_secs(&v)?);
    }

    settings.base_url()?;
    Ok(settings)
}

fn file_value(file_cfg: &HashMap<String, toml::Value>, key: &str) -> Option<String> {
    match file_cfg.get(key)? {
        toml::Value::String(v) => Some(v.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_secs(raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .with_context(|| format!("invalid request timeout '{raw}'"))
}
