//! Socket hooks for Dioxus components.
//!
//! Each hook registers its handlers through a [`SocketScope`] and removes them
//! when the component unmounts. The [`SocketManager`] itself comes from
//! context (see [`ConcordProvider`](crate::provider::ConcordProvider)).

use std::rc::Rc;

use concord_shared::{ClientCommand, DtuUpdate, EventKind, ResonanceUpdate, SocketEvent};
use dioxus::prelude::*;

use super::dtu::DtuChannel;
use super::manager::{HandlerId, SocketManager};
use super::resonance::ResonanceFeed;
use super::scope::SocketScope;

/// Connection controls for one component.
#[derive(Clone)]
pub struct SocketHandle {
    scope: Rc<SocketScope>,
    /// Reactive connection status.
    pub connected: Signal<bool>,
}

impl SocketHandle {
    pub fn is_connected(&self) -> bool {
        *self.connected.read()
    }

    pub fn connect(&self) {
        self.scope.connect();
    }

    pub fn disconnect(&self) {
        self.scope.disconnect();
    }

    pub fn emit(&self, command: ClientCommand) -> bool {
        self.scope.emit(command)
    }

    pub fn on(&self, kind: EventKind, handler: impl Fn(&SocketEvent) + 'static) -> HandlerId {
        self.scope.on(kind, handler)
    }

    pub fn off(&self, kind: &EventKind, id: Option<HandlerId>) {
        self.scope.off(kind, id);
    }

    pub fn manager(&self) -> SocketManager {
        self.scope.manager().clone()
    }
}

/// Hook to access the shared socket with a reactive `connected` flag.
pub fn use_socket() -> SocketHandle {
    let manager = use_context::<SocketManager>();
    let connected = use_signal(|| manager.is_connected());

    let scope = use_hook(move || {
        let scope = SocketScope::new(manager);
        scope.track_connection(move |status| {
            let mut connected = connected;
            connected.set(status);
        });
        Rc::new(scope)
    });

    let on_unmount = scope.clone();
    use_drop(move || on_unmount.close());

    SocketHandle { scope, connected }
}

/// Hook returning the latest `resonance:update` payload.
pub fn use_resonance_socket() -> Signal<Option<ResonanceUpdate>> {
    let manager = use_context::<SocketManager>();
    let latest = use_signal(|| None::<ResonanceUpdate>);

    let feed = use_hook(move || {
        Rc::new(ResonanceFeed::new(manager, move |update| {
            let mut latest = latest;
            latest.set(Some(update.clone()));
        }))
    });
    use_drop(move || feed.close());

    latest
}

/// DTU subscription controls for one component.
#[derive(Clone)]
pub struct DtuSocketHandle {
    pub socket: SocketHandle,
    channel: Rc<DtuChannel>,
}

impl DtuSocketHandle {
    pub fn is_connected(&self) -> bool {
        self.socket.is_connected()
    }

    pub fn subscribe_to_dtu(&self, dtu_id: &str) -> bool {
        self.channel.subscribe_to_dtu(dtu_id)
    }

    pub fn unsubscribe_from_dtu(&self, dtu_id: &str) -> bool {
        self.channel.unsubscribe_from_dtu(dtu_id)
    }

    pub fn on_dtu_update(&self, handler: impl Fn(&DtuUpdate) + 'static) -> HandlerId {
        self.channel.on_dtu_update(handler)
    }

    pub fn off_dtu_update(&self, id: Option<HandlerId>) {
        self.channel.off_dtu_update(id);
    }
}

/// Hook for subscribing to individual DTUs.
pub fn use_dtu_socket() -> DtuSocketHandle {
    let socket = use_socket();
    let manager = socket.manager();

    let channel = use_hook(move || Rc::new(DtuChannel::new(manager)));
    let on_unmount = channel.clone();
    use_drop(move || on_unmount.close());

    DtuSocketHandle { socket, channel }
}
