//! Dioxus hooks over the framework-free client state.
//!
//! Socket hooks live in [`crate::socket`]; these cover the local-state
//! utilities.

mod cross_lens_memory;
mod media_url;
mod proactive_chat;

pub use cross_lens_memory::{use_cross_lens_memory, CrossLensMemoryHandle};
pub use media_url::{use_media_url, MediaUrlHandle};
pub use proactive_chat::{use_proactive_chat, ProactiveHandle};
