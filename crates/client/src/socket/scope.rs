//! Per-consumer view of the shared socket.

use std::cell::RefCell;
use std::rc::Rc;

use concord_shared::{ClientCommand, EventKind, SocketEvent};

use super::manager::{HandlerId, SocketManager};

/// Handlers registered on behalf of one consumer (usually one component).
///
/// The manager outlives every consumer, so a scope remembers each handler it
/// registered and removes exactly those in [`close`](Self::close). Dropping the
/// scope closes it.
pub struct SocketScope {
    manager: SocketManager,
    registrations: RefCell<Vec<(EventKind, HandlerId)>>,
}

impl SocketScope {
    pub fn new(manager: SocketManager) -> Self {
        Self {
            manager,
            registrations: RefCell::new(Vec::new()),
        }
    }

    pub fn manager(&self) -> &SocketManager {
        &self.manager
    }

    /// Register handlers for `connect`, `disconnect` and `connect_error` that
    /// report the resulting connection status.
    pub fn track_connection(&self, on_status: impl Fn(bool) + 'static) {
        let on_status: Rc<dyn Fn(bool)> = Rc::new(on_status);

        let status = on_status.clone();
        self.on(EventKind::Connect, move |_| status(true));

        let status = on_status.clone();
        self.on(EventKind::Disconnect, move |_| status(false));

        self.on(EventKind::ConnectError, move |event| {
            if let SocketEvent::ConnectError { message } = event {
                crate::log_warn!("Socket connect_error: {}", message);
            }
            on_status(false)
        });
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn connect(&self) {
        self.manager.connect();
    }

    pub fn disconnect(&self) {
        self.manager.disconnect();
    }

    pub fn emit(&self, command: ClientCommand) -> bool {
        self.manager.emit(command)
    }

    pub fn on(&self, kind: EventKind, handler: impl Fn(&SocketEvent) + 'static) -> HandlerId {
        let id = self.manager.on(kind.clone(), handler);
        self.registrations.borrow_mut().push((kind, id));
        id
    }

    /// Remove one handler, or all handlers of `kind` (on the shared manager,
    /// not just this scope's) when `id` is `None`.
    pub fn off(&self, kind: &EventKind, id: Option<HandlerId>) {
        self.manager.off(kind, id);
        self.registrations
            .borrow_mut()
            .retain(|(k, h)| !(k == kind && id.map_or(true, |id| id == *h)));
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.borrow().len()
    }

    /// Unregister every handler this scope registered. Idempotent.
    pub fn close(&self) {
        let registrations = std::mem::take(&mut *self.registrations.borrow_mut());
        for (kind, id) in registrations {
            self.manager.off(&kind, Some(id));
        }
    }
}

impl Drop for SocketScope {
    fn drop(&mut self) {
        self.close();
    }
}
