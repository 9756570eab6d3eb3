use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub gateway_url: String,
    pub chat_poll_ms: u64,
    pub lobby_poll_ms: u64,
    pub min_players: usize,
    pub max_players: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:8734".into(),
            chat_poll_ms: 2_000,
            lobby_poll_ms: 10_000,
            min_players: 4,
            max_players: 8,
        }
    }
}

impl Settings {
    pub fn chat_poll_interval(&self) -> Duration {
        Duration::from_millis(self.chat_poll_ms.max(1))
    }

    pub fn lobby_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lobby_poll_ms.max(1))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    gateway_url: Option<String>,
    chat_poll_ms: Option<u64>,
    lobby_poll_ms: Option<u64>,
    min_players: Option<usize>,
    max_players: Option<usize>,
}

/// Defaults, then `client.toml` in the working directory, then `APP__*`
/// environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?;
        if let Some(v) = file_cfg.gateway_url {
            settings.gateway_url = v;
        }
        if let Some(v) = file_cfg.chat_poll_ms {
            settings.chat_poll_ms = v;
        }
        if let Some(v) = file_cfg.lobby_poll_ms {
            settings.lobby_poll_ms = v;
        }
        if let Some(v) = file_cfg.min_players {
            settings.min_players = v;
        }
        if let Some(v) = file_cfg.max_players {
            settings.max_players = v;
        }
    }

    if let Some(v) = env("APP__GATEWAY_URL") {
        settings.gateway_url = v;
    }
    if let Some(v) = env("APP__CHAT_POLL_MS").and_then(|v| v.parse().ok()) {
        settings.chat_poll_ms = v;
    }
    if let Some(v) = env("APP__LOBBY_POLL_MS").and_then(|v| v.parse().ok()) {
        settings.lobby_poll_ms = v;
    }
    if let Some(v) = env("APP__MIN_PLAYERS").and_then(|v| v.parse().ok()) {
        settings.min_players = v;
    }
    if let Some(v) = env("APP__MAX_PLAYERS").and_then(|v| v.parse().ok()) {
        settings.max_players = v;
    }

    settings.gateway_url = normalize_gateway_url(&settings.gateway_url)?;
    Ok(settings)
}

/// Validates the gateway URL and strips trailing slashes.
pub fn normalize_gateway_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let url = Url::parse(raw).with_context(|| format!("invalid gateway url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!("gateway url must start with http:// or https://"));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
