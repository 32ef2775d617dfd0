use std::cell::RefCell;
use std::rc::Rc;

use chrono::Utc;
use concord_shared::CrossLensMemory;
use dioxus::prelude::*;

use crate::memory_trail::MemoryTrail;
use crate::storage::SessionStore;

#[derive(Clone)]
pub struct CrossLensMemoryHandle {
    trail: Rc<RefCell<MemoryTrail>>,
    /// Reactive copy of the persisted state.
    pub memory: Signal<CrossLensMemory>,
}

impl CrossLensMemoryHandle {
    pub fn record_message(&self) {
        self.apply(|trail| trail.record_message());
    }

    pub fn clear_trail(&self) {
        self.apply(|trail| trail.clear_trail(Utc::now()));
    }

    pub fn toggle_memory_preserved(&self) {
        self.apply(|trail| {
            trail.toggle_memory_preserved();
        });
    }

    pub fn context_summary(&self) -> Option<String> {
        self.trail.borrow().context_summary()
    }

    fn apply(&self, change: impl FnOnce(&mut MemoryTrail)) {
        let state = {
            let mut trail = self.trail.borrow_mut();
            change(&mut trail);
            trail.state().clone()
        };
        let mut memory = self.memory;
        memory.set(state);
    }
}

/// Session-persisted trail of visited lenses, following `current_lens`.
pub fn use_cross_lens_memory(current_lens: ReadSignal<String>) -> CrossLensMemoryHandle {
    let store = use_context::<Rc<dyn SessionStore>>();

    let trail = use_hook(move || {
        let lens = current_lens.peek().as_str().to_owned();
        Rc::new(RefCell::new(MemoryTrail::load(store, &lens, Utc::now())))
    });
    let initial = trail.borrow().state().clone();
    let memory = use_signal(move || initial);

    let handle = CrossLensMemoryHandle { trail, memory };

    let on_lens = handle.clone();
    use_effect(move || {
        let lens = current_lens.cloned();
        on_lens.apply(|trail| trail.set_current_lens(&lens, Utc::now()));
    });

    handle
}
