use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
    pub password_cost: u32,
}

/// Keys accepted in `server.toml`; anything absent keeps its default.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    token_ttl_seconds: Option<i64>,
    password_cost: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            database_url: "sqlite://./data/server.db".into(),
            jwt_secret: "dev-secret-change-me".into(),
            token_ttl_seconds: 3600,
            password_cost: server_api::credentials::DEFAULT_COST,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.bind_addr {
                    settings.server_bind = v;
                }
                if let Some(v) = file_cfg.database_url {
                    settings.database_url = v;
                }
                if let Some(v) = file_cfg.jwt_secret {
                    settings.jwt_secret = v;
                }
                if let Some(v) = file_cfg.token_ttl_seconds {
                    settings.token_ttl_seconds = v;
                }
                if let Some(v) = file_cfg.password_cost {
                    settings.password_cost = v;
                }
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "ignoring unreadable settings file");
            }
        }
    }

    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Ok(v) = std::env::var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Ok(v) = std::env::var("JWT_SECRET") {
        settings.jwt_secret = v;
    }
    if let Ok(v) = std::env::var("APP__JWT_SECRET") {
        settings.jwt_secret = v;
    }

    if let Ok(v) = std::env::var("APP__TOKEN_TTL_SECONDS") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.token_ttl_seconds = parsed;
        }
    }

    if let Ok(v) = std::env::var("APP__PASSWORD_COST") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.password_cost = parsed;
        }
    }

    settings
}

/// Turns bare file paths into sqlite urls; the parent directory itself is
/// created by `Storage::new`.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.replace('\\', "/");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

pub fn validate(settings: &Settings) -> anyhow::Result<()> {
    if settings.jwt_secret.trim().is_empty() {
        anyhow::bail!("jwt_secret must not be empty");
    }
    if settings.token_ttl_seconds <= 0 {
        anyhow::bail!(
            "token_ttl_seconds must be positive, got {}",
            settings.token_ttl_seconds
        );
    }
    if !(server_api::credentials::MIN_COST..=31).contains(&settings.password_cost) {
        anyhow::bail!(
            "password_cost must be between {} and 31, got {}",
            server_api::credentials::MIN_COST,
            settings.password_cost
        );
    }
    settings
        .server_bind
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
