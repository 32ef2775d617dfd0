//! Concord Client - real-time and local-state core for the Concord web app
//!
//! This crate holds the shared socket connection and its subscription layers,
//! proactive chat suggestions, the cross-lens memory trail and media URL
//! resolution, each as plain Rust state with thin Dioxus hooks on top.

pub mod logging;

pub mod api_client;
pub mod config;
pub mod hooks;
pub mod media;
pub mod memory_trail;
pub mod proactive;
pub mod provider;
pub mod socket;
pub mod storage;
pub mod timer;

pub use api_client::ApiClient;
pub use config::ClientConfig;
pub use media::{MediaRequest, MediaUrlResolution, MediaUrlResolver};
pub use provider::ConcordProvider;
pub use socket::SocketManager;
