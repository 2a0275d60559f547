//! Gateway configuration
//!
//! Read from the process environment (after loading `.env`). Every key is
//! optional; unset keys keep the defaults of the sale window and the
//! upstream feed.

use std::net::SocketAddr;
use std::time::Duration;

use sale_window::WindowConfig;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_FEED_URL: &str = "wss://skinport.com/socket.io/?EIO=4&transport=websocket";
pub const DEFAULT_FEED_CURRENCY: &str = "EUR";
pub const DEFAULT_FEED_LOCALE: &str = "en";
pub const DEFAULT_FEED_APP_ID: u32 = 730;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

fn invalid(key: &'static str, value: &str) -> GatewayConfigError {
    GatewayConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

/// Upstream sale feed subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub enabled: bool,
    pub url: String,
    pub currency: String,
    pub locale: String,
    pub app_id: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_FEED_URL.to_string(),
            currency: DEFAULT_FEED_CURRENCY.to_string(),
            locale: DEFAULT_FEED_LOCALE.to_string(),
            app_id: DEFAULT_FEED_APP_ID,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub window: WindowConfig,
    pub feed: FeedConfig,
}

impl GatewayConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, GatewayConfigError> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|_| invalid("BIND_ADDR", &raw))?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .map_err(|_| invalid("BIND_ADDR", DEFAULT_BIND_ADDR))?,
        };

        let mut window = WindowConfig::default();
        if let Some(raw) = get("ITEM_EXPIRY_MS") {
            window.item_expiry = parse_millis("ITEM_EXPIRY_MS", &raw)?;
        }
        if let Some(raw) = get("CLEANUP_INTERVAL_MS") {
            window.cleanup_interval = parse_millis("CLEANUP_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = get("CATEGORY_DENY_LIST") {
            window.category_deny_list = raw
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }

        let mut feed = FeedConfig::default();
        if let Some(raw) = get("FEED_ENABLED") {
            feed.enabled = parse_bool("FEED_ENABLED", &raw)?;
        }
        if let Some(raw) = get("FEED_URL") {
            feed.url = raw.trim().to_string();
        }
        if let Some(raw) = get("FEED_CURRENCY") {
            feed.currency = raw.trim().to_string();
        }
        if let Some(raw) = get("FEED_LOCALE") {
            feed.locale = raw.trim().to_string();
        }
        if let Some(raw) = get("FEED_APP_ID") {
            feed.app_id = raw.trim().parse().map_err(|_| invalid("FEED_APP_ID", &raw))?;
        }

        Ok(Self {
            bind_addr,
            window,
            feed,
        })
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, GatewayConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| invalid(key, raw))
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, GatewayConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, raw)),
    }
}
