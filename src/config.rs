use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};

use dotenv::dotenv;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_DATABASE_URL: &str = "boards.db";
const DEFAULT_POOL_SIZE: u32 = 8;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_NOTIFICATION_INTERVAL_MS: u64 = 1_000;
const DEFAULT_CORS_ALLOW_ORIGINS: &str = "http://localhost:3000,http://frontend:3000";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// How strictly a move is checked against the depth ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveDepthCheck {
    /// Only the new parent's own depth is checked. Moving a deep subtree
    /// can still push its leaves past the ceiling.
    #[default]
    Parent,
    /// The new parent's depth plus the height of the moved subtree must fit.
    Subtree,
}

impl FromStr for MoveDepthCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parent" => Ok(MoveDepthCheck::Parent),
            "subtree" => Ok(MoveDepthCheck::Subtree),
            other => Err(format!("expected `parent` or `subtree`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
    pub busy_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub app_url: SocketAddr,
    pub database: DatabaseSettings,
    pub cors_allow_origins: Vec<String>,
    pub move_depth_check: MoveDepthCheck,
    pub notification_interval: Duration,
}

impl Settings {
    /// Reads settings from the environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_url = parse_var(&lookup, "APP_URL")?
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)));
        let pool_size = parse_var(&lookup, "DB_POOL_SIZE")?.unwrap_or(DEFAULT_POOL_SIZE);
        if pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_POOL_SIZE",
                value: pool_size.to_string(),
                reason: "pool size must be at least 1".to_string(),
            });
        }
        let busy_timeout_ms =
            parse_var(&lookup, "DB_BUSY_TIMEOUT_MS")?.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
        let notification_interval_ms = parse_var(&lookup, "NOTIFICATION_INTERVAL_MS")?
            .unwrap_or(DEFAULT_NOTIFICATION_INTERVAL_MS);
        if notification_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "NOTIFICATION_INTERVAL_MS",
                value: "0".to_string(),
                reason: "interval must be positive".to_string(),
            });
        }
        let move_depth_check =
            parse_var(&lookup, "BOARDS_MOVE_DEPTH_CHECK")?.unwrap_or_default();

        let cors_allow_origins = lookup("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ALLOW_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Settings {
            app_url,
            database: DatabaseSettings {
                url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                pool_size,
                busy_timeout: Duration::from_millis(busy_timeout_ms),
            },
            cors_allow_origins,
            move_depth_check,
            notification_interval: Duration::from_millis(notification_interval_ms),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: ToString,
{
    lookup(key)
        .map(|value| {
            value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
                key,
                reason: err.to_string(),
                value,
            })
        })
        .transpose()
}
