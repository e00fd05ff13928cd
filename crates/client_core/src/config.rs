use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

pub const SETTINGS_FILE: &str = "dictionary.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_url: String,
    pub page_size: usize,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".into(),
            page_size: 10,
            request_timeout_secs: 15,
        }
    }
}

impl ClientSettings {
    pub fn api_url(&self) -> Result<Url> {
        parse_api_url(&self.api_url)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    page_size: Option<usize>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then `dictionary.toml` in the working directory, then env overrides.
pub fn load_settings() -> Result<ClientSettings> {
    let mut settings = ClientSettings::default();
    let path = Path::new(SETTINGS_FILE);
    if path.exists() {
        settings = load_settings_file(path, settings)?;
    }
    settings = apply_env_overrides(settings, |key| std::env::var(key).ok());
    settings.api_url()?;
    Ok(settings)
}

pub fn load_settings_file(path: &Path, mut settings: ClientSettings) -> Result<ClientSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let file_cfg: FileSettings = toml::from_str(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;

    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }

    Ok(sanitize(settings))
}

/// `lookup` resolves an environment key; later keys win.
pub fn apply_env_overrides(
    mut settings: ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    if let Some(v) = lookup("DICTIONARY_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = lookup("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.trim().parse::<usize>() {
            settings.page_size = parsed;
        }
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    sanitize(settings)
}

fn sanitize(mut settings: ClientSettings) -> ClientSettings {
    let defaults = ClientSettings::default();
    settings.api_url = settings.api_url.trim().to_string();
    if settings.api_url.is_empty() {
        settings.api_url = defaults.api_url;
    }
    if settings.page_size == 0 {
        settings.page_size = defaults.page_size;
    }
    if settings.request_timeout_secs == 0 {
        settings.request_timeout_secs = defaults.request_timeout_secs;
    }
    settings
}

pub fn parse_api_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid api url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("api url '{raw}' must use http or https");
    }
    if url.cannot_be_a_base() {
        anyhow::bail!("api url '{raw}' cannot be used as a base url");
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
