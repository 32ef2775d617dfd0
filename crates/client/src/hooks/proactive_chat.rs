use std::cell::RefCell;
use std::rc::Rc;

use concord_shared::{DtuAction, ProactiveMessage};
use dioxus::prelude::*;

use crate::config::ClientConfig;
use crate::proactive::{ProactiveEngine, ProactiveOptions};
use crate::timer::{self, local_now};

#[derive(Clone)]
pub struct ProactiveHandle {
    engine: Rc<RefCell<ProactiveEngine>>,
    /// Suggestions currently showing, oldest first.
    pub messages: Signal<Vec<ProactiveMessage>>,
    revision: Signal<u64>,
}

impl ProactiveHandle {
    pub fn dismiss(&self, id: &str) {
        self.apply(|engine| {
            engine.dismiss(id);
        });
    }

    pub fn dismiss_all(&self) {
        self.apply(ProactiveEngine::dismiss_all);
    }

    pub fn add_dtu_notification(&self, title: &str, action: DtuAction) {
        self.apply(|engine| {
            engine.add_dtu_notification(title, action, local_now());
        });
    }

    /// Call on user activity to postpone the idle suggestion.
    pub fn reset_idle_timer(&self) {
        self.apply(|engine| engine.reset_idle_timer(local_now()));
    }

    /// Run `change`, publish the message list and wake the timer driver.
    fn apply(&self, change: impl FnOnce(&mut ProactiveEngine)) {
        let messages = {
            let mut engine = self.engine.borrow_mut();
            change(&mut engine);
            engine.messages().to_vec()
        };
        let mut signal = self.messages;
        signal.set(messages);
        let mut revision = self.revision;
        *revision.write() += 1;
    }
}

/// Time-based, idle and DTU-event suggestions for a chat panel.
///
/// Timers restart whenever `options` changes and are cleared on unmount.
pub fn use_proactive_chat(options: ReadSignal<ProactiveOptions>) -> ProactiveHandle {
    let config = try_use_context::<ClientConfig>()
        .map(|c| c.proactive)
        .unwrap_or_default();
    let engine = use_hook(move || Rc::new(RefCell::new(ProactiveEngine::new(config))));
    let messages = use_signal(Vec::new);
    let revision = use_signal(|| 0u64);

    let handle = ProactiveHandle {
        engine: engine.clone(),
        messages,
        revision,
    };

    let on_options = handle.clone();
    use_effect(move || {
        let options = options.cloned();
        on_options.apply(|engine| engine.update(options, local_now()));
    });

    // Sleeps until the next deadline; restarted on every revision.
    let driver = engine.clone();
    use_resource(move || {
        revision.read();
        let engine = driver.clone();
        async move {
            loop {
                let Some(deadline) = engine.borrow().next_deadline() else {
                    break;
                };
                timer::sleep_until(deadline).await;

                let fired = engine.borrow_mut().fire_due(local_now());
                if fired > 0 {
                    let mut messages = messages;
                    messages.set(engine.borrow().messages().to_vec());
                }
            }
        }
    });

    use_drop(move || engine.borrow_mut().teardown());

    handle
}
