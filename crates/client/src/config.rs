//! Client configuration from environment variables.
//!
//! On desktop the variables are read at runtime. In the browser there is no
//! process environment, so the same names are captured at build time.
//!
//! Environment variables:
//! - `CONCORD_API_URL`: backend base URL (default: `http://localhost:5050` on
//!   desktop, relative to the page origin in the browser)
//! - `CONCORD_SOCKET_URL`: real-time endpoint (default: the API URL with a
//!   `ws`/`wss` scheme and the `/socket` path)
//! - `CONCORD_RECONNECT_ATTEMPTS`: transport reconnect attempts (default: 5)
//! - `CONCORD_RECONNECT_DELAY_MS`: initial reconnect delay (default: 1000)
//! - `CONCORD_AUTO_CONNECT`: open the socket on startup (default: true)

use url::Url;

use crate::proactive::ProactiveConfig;
use crate::socket::ReconnectConfig;

pub const ENV_API_URL: &str = "CONCORD_API_URL";
pub const ENV_SOCKET_URL: &str = "CONCORD_SOCKET_URL";
pub const ENV_RECONNECT_ATTEMPTS: &str = "CONCORD_RECONNECT_ATTEMPTS";
pub const ENV_RECONNECT_DELAY_MS: &str = "CONCORD_RECONNECT_DELAY_MS";
pub const ENV_AUTO_CONNECT: &str = "CONCORD_AUTO_CONNECT";

/// Path of the real-time endpoint on the backend.
pub const SOCKET_PATH: &str = "/socket";

#[cfg(not(target_arch = "wasm32"))]
const DEFAULT_API_URL: &str = "http://localhost:5050";
#[cfg(target_arch = "wasm32")]
const DEFAULT_API_URL: &str = "";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL for REST calls. Empty means relative paths.
    pub api_base_url: String,
    /// URL of the real-time socket. May be a bare path in the browser.
    pub socket_url: String,
    pub reconnect: ReconnectConfig,
    pub proactive: ProactiveConfig,
    pub auto_connect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ClientConfig {
    /// Read configuration from the platform's environment.
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_base_url = lookup(ENV_API_URL)
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let socket_url = lookup(ENV_SOCKET_URL)
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| socket_url_for(&api_base_url));

        let mut reconnect = ReconnectConfig::default();
        if let Some(attempts) = parse_var(&lookup, ENV_RECONNECT_ATTEMPTS) {
            reconnect.max_attempts = attempts;
        }
        if let Some(delay) = parse_var(&lookup, ENV_RECONNECT_DELAY_MS) {
            reconnect.initial_delay_ms = delay;
        }

        let auto_connect = lookup(ENV_AUTO_CONNECT)
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        Self {
            api_base_url,
            socket_url,
            reconnect,
            proactive: ProactiveConfig::default(),
            auto_connect,
        }
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u32> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            crate::log_warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}

/// Derive the socket URL from the API base (`http` -> `ws`, `https` -> `wss`).
///
/// A base that is not an absolute URL (the browser default) yields a path.
pub fn socket_url_for(api_base_url: &str) -> String {
    let base = api_base_url.trim_end_matches('/');
    let Ok(mut url) = Url::parse(base) else {
        return format!("{base}{SOCKET_PATH}");
    };

    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    if url.set_scheme(scheme).is_err() {
        return format!("{base}{SOCKET_PATH}");
    }
    let path = format!("{}{SOCKET_PATH}", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.to_string()
}

#[cfg(not(target_arch = "wasm32"))]
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(target_arch = "wasm32")]
fn env_var(name: &str) -> Option<String> {
    let value = match name {
        ENV_API_URL => option_env!("CONCORD_API_URL"),
        ENV_SOCKET_URL => option_env!("CONCORD_SOCKET_URL"),
        ENV_RECONNECT_ATTEMPTS => option_env!("CONCORD_RECONNECT_ATTEMPTS"),
        ENV_RECONNECT_DELAY_MS => option_env!("CONCORD_RECONNECT_DELAY_MS"),
        ENV_AUTO_CONNECT => option_env!("CONCORD_AUTO_CONNECT"),
        _ => None,
    };
    value.map(str::to_string)
}
