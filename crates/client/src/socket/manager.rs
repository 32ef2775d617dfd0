//! Shared real-time connection.
//!
//! A single [`SocketManager`] is created at the app root and handed to every
//! consumer through context. Cloning it is cheap and shares the same
//! connection, handler table and `connected` flag.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use concord_shared::{ClientCommand, EventKind, Frame, ServerEvent, SocketEvent};
use futures_channel::mpsc::UnboundedReceiver;
use futures_util::StreamExt;

use super::transport::{Transport, TransportEvent, CLIENT_DISCONNECT_REASON};

/// Callback invoked for every event of the kind it was registered for.
pub type EventHandler = Rc<dyn Fn(&SocketEvent)>;

/// Identifies one registered handler so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Inner {
    transport: Rc<dyn Transport>,
    connected: bool,
    next_handler_id: u64,
    handlers: HashMap<EventKind, Vec<(HandlerId, EventHandler)>>,
}

#[derive(Clone)]
pub struct SocketManager {
    inner: Rc<RefCell<Inner>>,
}

impl SocketManager {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                transport,
                connected: false,
                next_handler_id: 0,
                handlers: HashMap::new(),
            })),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.borrow().connected
    }

    /// Open the transport unless already connected.
    pub fn connect(&self) {
        let transport = {
            let inner = self.inner.borrow();
            if inner.connected {
                return;
            }
            inner.transport.clone()
        };
        crate::log_info!("Socket: connecting");
        transport.open();
    }

    /// Close the transport if connected. The `disconnect` event is delivered
    /// before this returns; the transport does not report the close again.
    pub fn disconnect(&self) {
        let transport = {
            let inner = self.inner.borrow();
            if !inner.connected {
                return;
            }
            inner.transport.clone()
        };
        crate::log_info!("Socket: disconnecting");
        transport.close();
        self.dispatch(TransportEvent::Closed {
            reason: CLIENT_DISCONNECT_REASON.to_string(),
        });
    }

    /// Send a command. Dropped while disconnected; returns whether it was handed
    /// to the transport.
    pub fn emit(&self, command: ClientCommand) -> bool {
        match command.to_frame() {
            Ok(frame) => self.emit_frame(frame),
            Err(e) => {
                crate::log_error!("Socket: cannot encode {}: {}", command.kind(), e);
                false
            }
        }
    }

    /// Send an arbitrary frame. Same delivery rules as [`emit`](Self::emit).
    pub fn emit_frame(&self, frame: Frame) -> bool {
        let transport = {
            let inner = self.inner.borrow();
            if !inner.connected {
                crate::log_debug!("Socket: not connected, dropping '{}'", frame.event);
                return false;
            }
            inner.transport.clone()
        };
        let event = frame.event.clone();
        match transport.send(frame) {
            Ok(()) => true,
            Err(e) => {
                crate::log_error!("Socket: failed to send '{}': {}", event, e);
                false
            }
        }
    }

    pub fn on(&self, kind: EventKind, handler: impl Fn(&SocketEvent) + 'static) -> HandlerId {
        let mut inner = self.inner.borrow_mut();
        let id = HandlerId(inner.next_handler_id);
        inner.next_handler_id += 1;
        inner
            .handlers
            .entry(kind)
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Remove one handler, or every handler for `kind` when `id` is `None`.
    pub fn off(&self, kind: &EventKind, id: Option<HandlerId>) {
        let mut inner = self.inner.borrow_mut();
        match id {
            None => {
                inner.handlers.remove(kind);
            }
            Some(id) => {
                if let Some(list) = inner.handlers.get_mut(kind) {
                    list.retain(|(h, _)| *h != id);
                    if list.is_empty() {
                        inner.handlers.remove(kind);
                    }
                }
            }
        }
    }

    pub fn handler_count(&self, kind: &EventKind) -> usize {
        self.inner
            .borrow()
            .handlers
            .get(kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Apply one transport observation: update `connected` and fan the
    /// resulting event out to its handlers.
    pub fn dispatch(&self, event: TransportEvent) {
        let event = match event {
            TransportEvent::Opened => {
                self.inner.borrow_mut().connected = true;
                crate::log_info!("Socket: connected");
                SocketEvent::Connect
            }
            TransportEvent::Closed { reason } => {
                self.inner.borrow_mut().connected = false;
                crate::log_info!("Socket: disconnected ({})", reason);
                SocketEvent::Disconnect { reason }
            }
            TransportEvent::Error { message } => {
                self.inner.borrow_mut().connected = false;
                crate::log_error!("Socket: connection error: {}", message);
                SocketEvent::ConnectError { message }
            }
            TransportEvent::Frame(frame) => match ServerEvent::from_frame(frame) {
                Ok(event) => SocketEvent::Server(event),
                Err(e) => {
                    crate::log_error!("Socket: dropping frame: {}", e);
                    return;
                }
            },
        };
        self.deliver(&event);
    }

    fn deliver(&self, event: &SocketEvent) {
        // Snapshot so handlers may register or remove handlers while running.
        let handlers: Vec<EventHandler> = self
            .inner
            .borrow()
            .handlers
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        for handler in handlers {
            handler(event);
        }
    }

    /// Pump transport events into [`dispatch`](Self::dispatch) until the
    /// transport's channel closes.
    pub async fn run(self, mut events: UnboundedReceiver<TransportEvent>) {
        while let Some(event) = events.next().await {
            self.dispatch(event);
        }
        crate::log_debug!("Socket: transport channel closed");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};

    use concord_shared::Frame;

    use crate::socket::transport::{SocketError, Transport};

    /// Transport that records what the manager asks of it.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub opens: Cell<usize>,
        pub closes: Cell<usize>,
        pub sent: RefCell<Vec<Frame>>,
    }

    impl Transport for RecordingTransport {
        fn open(&self) {
            self.opens.set(self.opens.get() + 1);
        }

        fn close(&self) {
            self.closes.set(self.closes.get() + 1);
        }

        fn send(&self, frame: Frame) -> Result<(), SocketError> {
            self.sent.borrow_mut().push(frame);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use concord_shared::DtuUpdate;
    use futures_channel::mpsc::unbounded;
    use serde_json::json;

    use super::testing::RecordingTransport;
    use super::*;

    fn manager() -> (SocketManager, Rc<RecordingTransport>) {
        let transport = Rc::new(RecordingTransport::default());
        (SocketManager::new(transport.clone()), transport)
    }

    fn subscribe() -> ClientCommand {
        ClientCommand::DtuSubscribe {
            dtu_id: "d1".to_string(),
        }
    }

    #[test]
    fn connect_and_disconnect_are_idempotent() {
        let (socket, transport) = manager();

        socket.disconnect();
        assert_eq!(transport.closes.get(), 0);

        socket.connect();
        assert_eq!(transport.opens.get(), 1);
        socket.dispatch(TransportEvent::Opened);
        socket.connect();
        assert_eq!(transport.opens.get(), 1);

        socket.disconnect();
        assert_eq!(transport.closes.get(), 1);
        socket.disconnect();
        assert_eq!(transport.closes.get(), 1);
    }

    #[test]
    fn disconnect_takes_effect_immediately() {
        let (socket, transport) = manager();
        let reasons = Rc::new(RefCell::new(Vec::new()));
        let log = reasons.clone();
        socket.on(EventKind::Disconnect, move |event| {
            if let SocketEvent::Disconnect { reason } = event {
                log.borrow_mut().push(reason.clone());
            }
        });

        socket.connect();
        socket.dispatch(TransportEvent::Opened);
        socket.disconnect();
        assert!(!socket.is_connected());
        assert_eq!(*reasons.borrow(), vec![CLIENT_DISCONNECT_REASON]);
        assert!(!socket.emit(subscribe()));
        assert!(transport.sent.borrow().is_empty());

        // Reconnecting right away opens a new session.
        socket.connect();
        assert_eq!(transport.opens.get(), 2);
        socket.dispatch(TransportEvent::Opened);
        assert!(socket.is_connected());
    }

    #[test]
    fn emit_only_reaches_transport_while_connected() {
        let (socket, transport) = manager();

        assert!(!socket.emit(subscribe()));
        assert!(transport.sent.borrow().is_empty());

        socket.dispatch(TransportEvent::Opened);
        assert!(socket.emit(subscribe()));

        socket.dispatch(TransportEvent::Error {
            message: "timeout".into(),
        });
        assert!(!socket.is_connected());
        assert!(!socket.emit(subscribe()));

        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event, "dtu:subscribe");
    }

    #[test]
    fn off_without_id_removes_every_handler_for_the_kind() {
        let (socket, _) = manager();
        let a = socket.on(EventKind::DtuUpdate, |_| {});
        socket.on(EventKind::DtuUpdate, |_| {});
        socket.on(EventKind::Connect, |_| {});
        assert_eq!(socket.handler_count(&EventKind::DtuUpdate), 2);

        socket.off(&EventKind::DtuUpdate, Some(a));
        assert_eq!(socket.handler_count(&EventKind::DtuUpdate), 1);

        socket.off(&EventKind::DtuUpdate, None);
        assert_eq!(socket.handler_count(&EventKind::DtuUpdate), 0);
        assert_eq!(socket.handler_count(&EventKind::Connect), 1);
    }

    #[test]
    fn frames_reach_handlers_in_order() {
        let (socket, _) = manager();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = seen.clone();
        socket.on(EventKind::DtuUpdate, move |event| {
            if let SocketEvent::Server(ServerEvent::DtuUpdate(DtuUpdate { id, .. })) = event {
                log.borrow_mut().push(id.clone());
            }
        });

        for id in ["a", "b", "c"] {
            socket.dispatch(TransportEvent::Frame(Frame::new(
                "dtu:update",
                json!({ "id": id }),
            )));
        }
        // Malformed payloads are dropped without disturbing later frames.
        socket.dispatch(TransportEvent::Frame(Frame::new("dtu:update", json!(7))));
        socket.dispatch(TransportEvent::Frame(Frame::new("dtu:update", json!({ "id": "d" }))));

        assert_eq!(*seen.borrow(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn handlers_may_unregister_themselves() {
        let (socket, _) = manager();
        let calls = Rc::new(RefCell::new(0));

        let slot: Rc<RefCell<Option<HandlerId>>> = Rc::new(RefCell::new(None));
        let (inner_socket, inner_slot, inner_calls) = (socket.clone(), slot.clone(), calls.clone());
        let id = socket.on(EventKind::Connect, move |_| {
            *inner_calls.borrow_mut() += 1;
            let id = *inner_slot.borrow();
            inner_socket.off(&EventKind::Connect, id);
        });
        *slot.borrow_mut() = Some(id);

        socket.dispatch(TransportEvent::Opened);
        socket.dispatch(TransportEvent::Opened);
        assert_eq!(*calls.borrow(), 1);
    }

    #[tokio::test]
    async fn run_pumps_until_channel_closes() {
        let (socket, _) = manager();
        let (tx, rx) = unbounded();
        tx.unbounded_send(TransportEvent::Opened).unwrap();
        drop(tx);

        socket.clone().run(rx).await;
        assert!(socket.is_connected());
    }
}
