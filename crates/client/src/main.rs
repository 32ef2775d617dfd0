//! Concord Client - Main entry point
//!
//! A small status panel over the client core.
//! Supports both web (WASM) and desktop platforms.

#![allow(non_snake_case)]

use concord_shared::{DtuAction, MediaQuality};
use concord_client::api_client::health_label;
use concord_client::hooks::{use_cross_lens_memory, use_media_url, use_proactive_chat};
use concord_client::logging;
use concord_client::proactive::ProactiveOptions;
use concord_client::socket::{use_dtu_socket, use_resonance_socket};
use concord_client::{ApiClient, ConcordProvider, MediaRequest};
use dioxus::prelude::*;

const LENSES: [&str; 4] = ["healthcare", "finance", "legal", "research"];
const WELCOME_DTU: &str = "dtu-welcome";

fn main() {
    logging::init(None);
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        ConcordProvider {
            StatusPanel {}
        }
    }
}

#[component]
fn StatusPanel() -> Element {
    let mut lens = use_signal(|| LENSES[0].to_string());
    let mut options = use_signal(|| ProactiveOptions::new(LENSES[0]));
    let mut media_request = use_signal(|| MediaRequest::new("").quality(MediaQuality::Sd));

    let dtu = use_dtu_socket();
    let resonance = use_resonance_socket();
    let proactive = use_proactive_chat(options.into());
    let memory = use_cross_lens_memory(lens.into());
    let media = use_media_url(media_request.into());

    let api = use_context::<ApiClient>();
    let mut health = use_resource(move || {
        let api = api.clone();
        async move { health_label(&api.status().await) }
    });

    // DTU events become proactive notifications.
    let notify = proactive.clone();
    let updates = dtu.clone();
    use_hook(move || {
        updates.on_dtu_update(move |update| {
            // An update without an action is a plain edit.
            let action = update.dtu_action().unwrap_or(DtuAction::Updated);
            notify.add_dtu_notification(update.display_name(), action);
        })
    });

    let subscriber = dtu.clone();
    use_effect(move || {
        if *subscriber.socket.connected.read() {
            subscriber.subscribe_to_dtu(WELCOME_DTU);
        }
    });

    let connected = dtu.is_connected();
    let coherence = resonance
        .read()
        .as_ref()
        .and_then(|r| r.metric("coherence"));
    let trail = memory.memory.read().trail.clone();
    let summary = memory.context_summary();
    let suggestions = proactive.messages.cloned();
    let resolution = media.resolution();
    let media_label = if resolution.is_cdn { "CDN link" } else { "Direct link" };
    let media_error = resolution.error.as_ref().map(|e| e.user_message());
    let hash = media_request.read().hash.clone();
    let backend = health
        .read()
        .as_ref()
        .cloned()
        .unwrap_or_else(|| "checking".to_string());

    let toggle = dtu.socket.clone();
    let record = memory.clone();
    let clear = memory.clone();
    let activity = proactive.clone();
    let dismiss_all = proactive.clone();

    rsx! {
        div { class: "concord-status",
            header {
                span { class: if connected { "dot online" } else { "dot offline" } }
                if connected { "Connected" } else { "Offline" }
                button {
                    onclick: move |_| {
                        if toggle.is_connected() {
                            toggle.disconnect();
                        } else {
                            toggle.connect();
                        }
                    },
                    if connected { "Disconnect" } else { "Connect" }
                }
                if let Some(value) = coherence {
                    span { class: "resonance", "coherence {value:.2}" }
                }
                span { class: "backend", "backend: {backend}" }
                button { onclick: move |_| health.restart(), "Recheck" }
            }

            nav {
                for name in LENSES {
                    button {
                        key: "{name}",
                        class: if *lens.read() == name { "lens active" } else { "lens" },
                        onclick: move |_| {
                            lens.set(name.to_string());
                            options.write().current_lens = name.to_string();
                        },
                        "{name}"
                    }
                }
            }

            section { class: "chat",
                button {
                    onclick: move |_| {
                        options.write().message_count += 1;
                        record.record_message();
                        activity.reset_idle_timer();
                    },
                    "Send message"
                }
                ul {
                    for message in suggestions {
                        li { key: "{message.id}",
                            "{message.content}"
                            button {
                                onclick: {
                                    let proactive = proactive.clone();
                                    let id = message.id.clone();
                                    move |_| proactive.dismiss(&id)
                                },
                                "×"
                            }
                        }
                    }
                }
                button { onclick: move |_| dismiss_all.dismiss_all(), "Dismiss all" }
            }

            section { class: "trail",
                ol {
                    for entry in trail {
                        li { key: "{entry.lens}", "{entry.lens} ({entry.message_count})" }
                    }
                }
                if let Some(summary) = summary {
                    p { "{summary}" }
                }
                button { onclick: move |_| clear.clear_trail(), "Clear trail" }
            }

            section { class: "media",
                input {
                    placeholder: "content hash",
                    value: "{hash}",
                    oninput: move |e| media_request.write().hash = e.value(),
                }
                if media.is_loading() {
                    span { "Resolving…" }
                } else if let Some(url) = resolution.url {
                    a { href: "{url}", "{media_label}" }
                }
                if let Some(error) = media_error {
                    span { class: "error", "{error}" }
                }
                button { onclick: move |_| media.refresh(), "Refresh" }
            }
        }
    }
}
