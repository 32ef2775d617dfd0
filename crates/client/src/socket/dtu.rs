//! DTU subscription control over the shared socket.

use concord_shared::{ClientCommand, DtuUpdate, EventKind, ServerEvent, SocketEvent};

use super::manager::{HandlerId, SocketManager};
use super::scope::SocketScope;

/// Emits `dtu:subscribe` / `dtu:unsubscribe` and relays `dtu:update`.
pub struct DtuChannel {
    scope: SocketScope,
}

impl DtuChannel {
    pub fn new(manager: SocketManager) -> Self {
        Self {
            scope: SocketScope::new(manager),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.scope.is_connected()
    }

    /// Ask the backend for updates about one DTU. No-op while disconnected.
    pub fn subscribe_to_dtu(&self, dtu_id: &str) -> bool {
        self.scope.emit(ClientCommand::DtuSubscribe {
            dtu_id: dtu_id.to_string(),
        })
    }

    /// No-op while disconnected.
    pub fn unsubscribe_from_dtu(&self, dtu_id: &str) -> bool {
        self.scope.emit(ClientCommand::DtuUnsubscribe {
            dtu_id: dtu_id.to_string(),
        })
    }

    pub fn on_dtu_update(&self, handler: impl Fn(&DtuUpdate) + 'static) -> HandlerId {
        self.scope.on(EventKind::DtuUpdate, move |event| {
            if let SocketEvent::Server(ServerEvent::DtuUpdate(update)) = event {
                handler(update);
            }
        })
    }

    /// Remove one update handler, or all of them when `id` is `None`.
    pub fn off_dtu_update(&self, id: Option<HandlerId>) {
        self.scope.off(&EventKind::DtuUpdate, id);
    }

    pub fn close(&self) {
        self.scope.close();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use concord_shared::Frame;
    use serde_json::json;

    use super::*;
    use crate::socket::manager::testing::RecordingTransport;
    use crate::socket::transport::TransportEvent;

    fn setup() -> (SocketManager, Rc<RecordingTransport>, DtuChannel) {
        let transport = Rc::new(RecordingTransport::default());
        let socket = SocketManager::new(transport.clone());
        let channel = DtuChannel::new(socket.clone());
        (socket, transport, channel)
    }

    #[test]
    fn subscribe_is_a_noop_while_disconnected() {
        let (socket, transport, channel) = setup();
        assert!(!channel.subscribe_to_dtu("d1"));
        assert!(transport.sent.borrow().is_empty());

        socket.dispatch(TransportEvent::Opened);
        assert!(channel.subscribe_to_dtu("d1"));
        assert!(channel.unsubscribe_from_dtu("d1"));

        let sent = transport.sent.borrow();
        assert_eq!(sent[0], Frame::new("dtu:subscribe", json!({ "dtuId": "d1" })));
        assert_eq!(sent[1], Frame::new("dtu:unsubscribe", json!({ "dtuId": "d1" })));
    }

    #[test]
    fn relays_updates_until_removed() {
        let (socket, _, channel) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let id = channel.on_dtu_update(move |update| log.borrow_mut().push(update.id.clone()));

        let update = || {
            TransportEvent::Frame(Frame::new("dtu:update", json!({ "dtuId": "d9", "action": "promoted" })))
        };
        socket.dispatch(update());
        channel.off_dtu_update(Some(id));
        socket.dispatch(update());

        assert_eq!(*seen.borrow(), vec!["d9"]);
    }

    #[test]
    fn close_removes_update_handlers() {
        let (socket, _, channel) = setup();
        channel.on_dtu_update(|_| {});
        channel.on_dtu_update(|_| {});
        channel.close();
        assert_eq!(socket.handler_count(&EventKind::DtuUpdate), 0);
    }
}
