//! Transports carry frames between the socket manager and the backend.
//!
//! A transport owns reconnection (driven by [`ReconnectConfig`]) and reports
//! everything that happens on the wire as [`TransportEvent`]s on an unbounded
//! channel. [`SocketManager::run`](super::SocketManager::run) pumps that
//! channel into the manager.

use concord_shared::Frame;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SocketError {
    #[error("socket is closed")]
    Closed,
}

/// Reason reported when the client itself closes the connection.
pub const CLIENT_DISCONNECT_REASON: &str = "io client disconnect";

/// What a transport observed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Closed { reason: String },
    Error { message: String },
    Frame(Frame),
}

/// The wire underneath a [`SocketManager`](super::SocketManager).
pub trait Transport {
    /// Start connecting. Calling it while a session is running does nothing.
    fn open(&self);
    /// Stop the current session and any pending reconnect. A stopped session
    /// reports no `Closed` event; the caller owns that transition.
    fn close(&self);
    fn send(&self, frame: Frame) -> Result<(), SocketError>;
}

/// Transport-level reconnection policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay in milliseconds
    pub initial_delay_ms: u32,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u32,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> u32 {
        let delay = self.initial_delay_ms as f32 * self.backoff_multiplier.powi(attempt as i32);
        (delay as u32).min(self.max_delay_ms)
    }

    /// Whether `attempt` failed attempts exhaust the policy.
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

// Include platform-specific implementation
#[cfg(target_arch = "wasm32")]
mod transport_wasm;
#[cfg(target_arch = "wasm32")]
pub use transport_wasm::WsTransport;

#[cfg(not(target_arch = "wasm32"))]
mod transport_native;
#[cfg(not(target_arch = "wasm32"))]
pub use transport_native::WsTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_capped() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(0), 1000);
        assert_eq!(config.delay_for_attempt(1), 2000);
        assert_eq!(config.delay_for_attempt(2), 4000);
        assert_eq!(config.delay_for_attempt(3), 5000);
    }

    #[test]
    fn zero_attempts_means_unlimited() {
        let config = ReconnectConfig::default();
        assert!(!config.exhausted(4));
        assert!(config.exhausted(5));

        let unlimited = ReconnectConfig {
            max_attempts: 0,
            ..ReconnectConfig::default()
        };
        assert!(!unlimited.exhausted(1_000));
    }
}
