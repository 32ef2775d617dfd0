//! Latest-value subscription to `resonance:update`.

use std::cell::RefCell;
use std::rc::Rc;

use concord_shared::{EventKind, ResonanceUpdate, ServerEvent, SocketEvent};

use super::manager::SocketManager;
use super::scope::SocketScope;

/// Keeps the most recent resonance payload for as long as it is alive.
pub struct ResonanceFeed {
    scope: SocketScope,
    latest: Rc<RefCell<Option<ResonanceUpdate>>>,
}

impl ResonanceFeed {
    /// Subscribe immediately; `on_update` runs after each new payload is stored.
    pub fn new(manager: SocketManager, on_update: impl Fn(&ResonanceUpdate) + 'static) -> Self {
        let scope = SocketScope::new(manager);
        let latest = Rc::new(RefCell::new(None));

        let store = latest.clone();
        scope.on(EventKind::ResonanceUpdate, move |event| {
            if let SocketEvent::Server(ServerEvent::ResonanceUpdate(update)) = event {
                *store.borrow_mut() = Some(update.clone());
                on_update(update);
            }
        });

        Self { scope, latest }
    }

    pub fn latest(&self) -> Option<ResonanceUpdate> {
        self.latest.borrow().clone()
    }

    /// Unsubscribe the handler registered in [`new`](Self::new).
    pub fn close(&self) {
        self.scope.close();
    }
}
