use std::{collections::HashMap, fs, time::Duration};

use tracing::warn;

use crate::query::PageSize;

pub const SETTINGS_FILE: &str = "marketplace.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub default_page_size: PageSize,
    pub login_path: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".into(),
            request_timeout_secs: 30,
            default_page_size: PageSize::DEFAULT,
            login_path: "/auth/login".into(),
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Defaults, then `marketplace.toml` in the working directory, then
/// environment variables.
pub fn load_settings() -> ClientSettings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    settings_from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

pub fn settings_from_sources(
    file_contents: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Some(raw) = file_contents {
        match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => {
                let values: HashMap<String, String> = file_cfg
                    .into_iter()
                    .filter_map(|(key, value)| match value {
                        toml::Value::String(text) => Some((key, text)),
                        toml::Value::Integer(number) => Some((key, number.to_string())),
                        _ => None,
                    })
                    .collect();
                apply(&mut settings, |key| values.get(key).cloned());
            }
            Err(err) => warn!(file = SETTINGS_FILE, error = %err, "ignoring malformed settings file"),
        }
    }

    if let Some(v) = env("MARKETPLACE_API_URL") {
        settings.api_base_url = v;
    }
    apply(&mut settings, |key| env(&format!("APP__{}", key.to_ascii_uppercase())));

    settings
}

fn apply(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("api_base_url") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("request_timeout_secs") {
        match v.trim().parse::<u64>() {
            Ok(parsed) if parsed > 0 => settings.request_timeout_secs = parsed,
            _ => warn!(value = %v, "ignoring invalid request_timeout_secs"),
        }
    }
    if let Some(v) = lookup("default_page_size") {
        match v.trim().parse::<u32>().ok().and_then(PageSize::new) {
            Some(size) => settings.default_page_size = size,
            None => warn!(value = %v, "ignoring invalid default_page_size"),
        }
    }
    if let Some(v) = lookup("login_path") {
        settings.login_path = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
