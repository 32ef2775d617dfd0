//! Real-time connection to the Concord backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  TransportEvent   ┌───────────────┐  SocketEvent  ┌─────────────┐
//! │ WsTransport  │ ────────────────▶ │ SocketManager │ ────────────▶ │ SocketScope │ (one per
//! │ (reconnects) │ ◀──────────────── │  (connected)  │ ◀──────────── │             │  component)
//! └──────────────┘      Frame        └───────────────┘  on/off/emit  └─────────────┘
//! ```
//!
//! The manager is the only place the `connected` flag changes. Scopes track
//! which handlers their component registered so unmounting removes exactly
//! those, while the manager and transport live on.
//!
//! # Usage
//!
//! ```rust,ignore
//! fn DtuBadge(dtu_id: String) -> Element {
//!     let dtu = use_dtu_socket();
//!     let connected = dtu.is_connected();
//!
//!     use_effect(move || {
//!         if connected {
//!             dtu.subscribe_to_dtu(&dtu_id);
//!         }
//!     });
//!
//!     rsx! { span { if connected { "live" } else { "offline" } } }
//! }
//! ```

mod dtu;
mod hooks;
mod manager;
mod resonance;
mod scope;
mod transport;

pub use dtu::DtuChannel;
pub use hooks::{
    use_dtu_socket, use_resonance_socket, use_socket, DtuSocketHandle, SocketHandle,
};
pub use manager::{EventHandler, HandlerId, SocketManager};
pub use resonance::ResonanceFeed;
pub use scope::SocketScope;
pub use transport::{
    ReconnectConfig, SocketError, Transport, TransportEvent, WsTransport, CLIENT_DISCONNECT_REASON,
};
