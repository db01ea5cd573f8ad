use std::{collections::HashMap, fmt, fs, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "innkeeper.toml";

#[derive(Clone, Deserialize)]
pub struct ConsoleSettings {
    pub tenant_api_url: String,
    pub tenant_api_token: Option<String>,
    pub ui_origin: String,
    pub frontend_api_path: String,
    pub reservation_status_route: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            tenant_api_url: "http://localhost:5100".into(),
            tenant_api_token: None,
            ui_origin: "http://localhost:5101".into(),
            frontend_api_path: "api".into(),
            reservation_status_route: "reservation-status".into(),
        }
    }
}

impl fmt::Debug for ConsoleSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSettings")
            .field("tenant_api_url", &self.tenant_api_url)
            .field(
                "tenant_api_token",
                &self.tenant_api_token.as_ref().map(|_| "<redacted>"),
            )
            .field("ui_origin", &self.ui_origin)
            .field("frontend_api_path", &self.frontend_api_path)
            .field("reservation_status_route", &self.reservation_status_route)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{field} is not a valid url '{value}': {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("{field} must use http or https, got '{scheme}'")]
    UnsupportedScheme { field: &'static str, scheme: String },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

impl ConsoleSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        parse_http_url("tenant_api_url", &self.tenant_api_url)?;
        parse_http_url("ui_origin", &self.ui_origin)?;
        if self.frontend_api_path.trim_matches('/').is_empty() {
            return Err(SettingsError::Empty {
                field: "frontend_api_path",
            });
        }
        if self.reservation_status_route.trim_matches('/').is_empty() {
            return Err(SettingsError::Empty {
                field: "reservation_status_route",
            });
        }
        Ok(())
    }

    /// Scheme, host and port of the UI, without any path.
    pub fn ui_origin(&self) -> Result<String, SettingsError> {
        let url = parse_http_url("ui_origin", &self.ui_origin)?;
        Ok(url.origin().ascii_serialization())
    }
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, SettingsError> {
    if value.trim().is_empty() {
        return Err(SettingsError::Empty { field });
    }
    let url = Url::parse(value.trim()).map_err(|source| SettingsError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SettingsError::UnsupportedScheme {
            field,
            scheme: other.to_string(),
        }),
    }
}

pub fn load_settings() -> ConsoleSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file if it exists, then the environment.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ConsoleSettings {
    let mut settings = ConsoleSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, env);

    settings
}

fn apply_file_overrides(settings: &mut ConsoleSettings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!("settings: ignoring unreadable settings file err={err}");
            return;
        }
    };

    if let Some(v) = file_cfg.get("tenant_api_url") {
        settings.tenant_api_url = v.clone();
    }
    if let Some(v) = file_cfg.get("tenant_api_token") {
        settings.tenant_api_token = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("ui_origin") {
        settings.ui_origin = v.clone();
    }
    if let Some(v) = file_cfg.get("frontend_api_path") {
        settings.frontend_api_path = v.clone();
    }
    if let Some(v) = file_cfg.get("reservation_status_route") {
        settings.reservation_status_route = v.clone();
    }
}

fn apply_env_overrides(settings: &mut ConsoleSettings, env: impl Fn(&str) -> Option<String>) {
    let lookup = |primary: &str, alias: &str| env(alias).or_else(|| env(primary));

    if let Some(v) = lookup("INNKEEPER_TENANT_API_URL", "APP__TENANT_API_URL") {
        settings.tenant_api_url = v;
    }
    if let Some(v) = lookup("INNKEEPER_TENANT_API_TOKEN", "APP__TENANT_API_TOKEN") {
        settings.tenant_api_token = Some(v);
    }
    if let Some(v) = lookup("INNKEEPER_UI_ORIGIN", "APP__UI_ORIGIN") {
        settings.ui_origin = v;
    }
    if let Some(v) = lookup("INNKEEPER_FRONTEND_API_PATH", "APP__FRONTEND_API_PATH") {
        settings.frontend_api_path = v;
    }
    if let Some(v) = lookup(
        "INNKEEPER_RESERVATION_STATUS_ROUTE",
        "APP__RESERVATION_STATUS_ROUTE",
    ) {
        settings.reservation_status_route = v;
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
