use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context};
use client_core::ConsoleOptions;
use toml::Value;
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "roster.toml";
const DATA_DIR_NAME: &str = "roster_console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub data_dir: Option<PathBuf>,
    pub grid_page_size: u32,
    pub tile_page_size: u32,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let options = ConsoleOptions::default();
        Self {
            api_url: "http://localhost:4000/graphql".into(),
            data_dir: None,
            grid_page_size: options.grid_page_size,
            tile_page_size: options.tile_page_size,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn console_options(&self) -> ConsoleOptions {
        ConsoleOptions {
            grid_page_size: self.grid_page_size,
            tile_page_size: self.tile_page_size,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Directory holding the session file.
    pub fn resolve_data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("unable to resolve local app data dir"))?;
        Ok(base.join(DATA_DIR_NAME))
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    settings_from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `roster.toml` table, then environment variables.
pub fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match raw.parse::<toml::Table>() {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("api_url").and_then(Value::as_str) {
                    settings.api_url = v.to_string();
                }
                if let Some(v) = file_cfg.get("data_dir").and_then(Value::as_str) {
                    settings.data_dir = Some(PathBuf::from(v));
                }
                if let Some(v) = file_cfg.get("grid_page_size").and_then(scalar_text) {
                    apply_positive(&mut settings.grid_page_size, &v);
                }
                if let Some(v) = file_cfg.get("tile_page_size").and_then(scalar_text) {
                    apply_positive(&mut settings.tile_page_size, &v);
                }
                if let Some(v) = file_cfg.get("request_timeout_secs").and_then(scalar_text) {
                    apply_positive(&mut settings.request_timeout_secs, &v);
                }
            }
            Err(err) => warn!("ignoring {SETTINGS_FILE}: {err}"),
        }
    }

    if let Some(v) = env("ROSTER_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("ROSTER_DATA_DIR") {
        settings.data_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = env("APP__DATA_DIR") {
        settings.data_dir = Some(PathBuf::from(v));
    }

    if let Some(v) = env("APP__GRID_PAGE_SIZE") {
        apply_positive(&mut settings.grid_page_size, &v);
    }
    if let Some(v) = env("APP__TILE_PAGE_SIZE") {
        apply_positive(&mut settings.tile_page_size, &v);
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        apply_positive(&mut settings.request_timeout_secs, &v);
    }

    settings
}

/// Numeric keys may be written as TOML integers or quoted strings.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Integer(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn apply_positive<T>(target: &mut T, raw: &str)
where
    T: std::str::FromStr + PartialOrd + Default,
{
    if let Ok(parsed) = raw.trim().parse::<T>() {
        if parsed > T::default() {
            *target = parsed;
        }
    }
}

pub fn validate_api_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid API url '{raw}'"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("unsupported API url scheme '{other}'"),
    }
    if url.host_str().is_none() {
        bail!("API url '{raw}' has no host");
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
