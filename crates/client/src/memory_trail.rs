//! Cross-lens memory: which lenses the user visited this session, in order.
//!
//! The trail is persisted to session storage after every change so it
//! survives reloads within a tab but not across sessions.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use concord_shared::{CrossLensMemory, LensTrailEntry};

use crate::storage::{self, SessionStore};

pub const MEMORY_STORAGE_KEY: &str = "concord_cross_lens_memory";

pub struct MemoryTrail {
    store: Rc<dyn SessionStore>,
    state: CrossLensMemory,
    current_lens: String,
}

impl MemoryTrail {
    /// Restore the persisted trail (or start empty) and record a visit to
    /// `current_lens`.
    pub fn load(store: Rc<dyn SessionStore>, current_lens: &str, now: DateTime<Utc>) -> Self {
        let state = storage::load::<CrossLensMemory>(store.as_ref(), MEMORY_STORAGE_KEY)
            .unwrap_or_default();
        let mut trail = Self {
            store,
            state,
            current_lens: String::new(),
        };
        trail.set_current_lens(current_lens, now);
        trail
    }

    pub fn state(&self) -> &CrossLensMemory {
        &self.state
    }

    pub fn trail(&self) -> &[LensTrailEntry] {
        &self.state.trail
    }

    pub fn total_lens_count(&self) -> u32 {
        self.state.total_lens_count
    }

    pub fn memory_preserved(&self) -> bool {
        self.state.memory_preserved
    }

    pub fn current_lens(&self) -> &str {
        &self.current_lens
    }

    /// Make `lens` the most recent trail entry.
    ///
    /// Revisiting a lens moves its entry to the end and keeps its message
    /// count; `total_lens_count` only grows for lenses not yet on the trail.
    pub fn set_current_lens(&mut self, lens: &str, now: DateTime<Utc>) {
        self.current_lens = lens.to_string();
        let trail = &mut self.state.trail;

        if trail.last().is_some_and(|e| e.lens == lens) {
            return;
        }

        match trail.iter().position(|e| e.lens == lens) {
            Some(index) => {
                let mut entry = trail.remove(index);
                entry.entered_at = now;
                trail.push(entry);
            }
            None => {
                trail.push(LensTrailEntry::new(lens, now));
                self.state.total_lens_count += 1;
            }
        }
        self.persist();
    }

    /// Count one chat message against the current lens, adding it to the
    /// trail if it is missing.
    pub fn record_message(&mut self) {
        let lens = &self.current_lens;
        match self.state.trail.iter_mut().rev().find(|e| &e.lens == lens) {
            Some(entry) => entry.message_count += 1,
            None => {
                let mut entry = LensTrailEntry::new(lens.clone(), Utc::now());
                entry.message_count = 1;
                self.state.trail.push(entry);
                self.state.total_lens_count += 1;
            }
        }
        self.persist();
    }

    /// Forget every lens but the current one.
    pub fn clear_trail(&mut self, now: DateTime<Utc>) {
        self.state.trail = vec![LensTrailEntry::new(self.current_lens.clone(), now)];
        self.state.total_lens_count = 1;
        self.persist();
    }

    pub fn toggle_memory_preserved(&mut self) -> bool {
        self.state.memory_preserved = !self.state.memory_preserved;
        self.persist();
        self.state.memory_preserved
    }

    /// Short description of the other lenses visited, most recent last, for
    /// carrying context into the current lens.
    pub fn context_summary(&self) -> Option<String> {
        if !self.state.memory_preserved {
            return None;
        }
        let previous: Vec<String> = self
            .state
            .trail
            .iter()
            .filter(|e| e.lens != self.current_lens)
            .map(|e| match e.message_count {
                1 => format!("{} (1 message)", e.lens),
                n => format!("{} ({} messages)", e.lens, n),
            })
            .collect();
        if previous.is_empty() {
            None
        } else {
            Some(format!("Previously visited: {}", previous.join(" -> ")))
        }
    }

    fn persist(&self) {
        if !storage::save(self.store.as_ref(), MEMORY_STORAGE_KEY, &self.state) {
            crate::log_warn!("memory trail: could not persist session state");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::storage::MemoryStorage;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn lenses(trail: &MemoryTrail) -> Vec<&str> {
        trail.trail().iter().map(|e| e.lens.as_str()).collect()
    }

    fn persisted(store: &MemoryStorage) -> CrossLensMemory {
        storage::load(store, MEMORY_STORAGE_KEY).unwrap()
    }

    #[test]
    fn fresh_session_starts_with_current_lens() {
        let store = MemoryStorage::new();
        let trail = MemoryTrail::load(Rc::new(store.clone()), "healthcare", t(0));

        assert_eq!(lenses(&trail), vec!["healthcare"]);
        assert_eq!(trail.total_lens_count(), 1);
        assert!(trail.memory_preserved());
        assert_eq!(persisted(&store), *trail.state());
    }

    #[test]
    fn revisiting_moves_entry_to_end_and_keeps_count() {
        let store = MemoryStorage::new();
        let mut trail = MemoryTrail::load(Rc::new(store.clone()), "healthcare", t(0));
        trail.record_message();
        trail.record_message();
        trail.set_current_lens("finance", t(1));
        trail.set_current_lens("legal", t(2));
        trail.set_current_lens("healthcare", t(3));

        assert_eq!(lenses(&trail), vec!["finance", "legal", "healthcare"]);
        assert_eq!(trail.total_lens_count(), 3);
        let last = &trail.trail()[2];
        assert_eq!(last.message_count, 2);
        assert_eq!(last.entered_at, t(3));

        // Re-selecting the last lens changes nothing.
        trail.set_current_lens("healthcare", t(4));
        assert_eq!(trail.trail()[2].entered_at, t(3));
        assert_eq!(persisted(&store).trail.len(), 3);
    }

    #[test]
    fn reload_restores_persisted_trail() {
        let store = MemoryStorage::new();
        {
            let mut trail = MemoryTrail::load(Rc::new(store.clone()), "healthcare", t(0));
            trail.set_current_lens("finance", t(1));
            trail.record_message();
        }
        let trail = MemoryTrail::load(Rc::new(store.clone()), "finance", t(5));
        assert_eq!(lenses(&trail), vec!["healthcare", "finance"]);
        assert_eq!(trail.trail()[1].message_count, 1);
        assert_eq!(trail.total_lens_count(), 2);
    }

    #[test]
    fn unreadable_state_starts_empty() {
        let store = MemoryStorage::new();
        store.set_item(MEMORY_STORAGE_KEY, "{not json");
        let trail = MemoryTrail::load(Rc::new(store.clone()), "legal", t(0));
        assert_eq!(lenses(&trail), vec!["legal"]);
        assert_eq!(trail.total_lens_count(), 1);
    }

    #[test]
    fn recording_without_an_entry_adds_one() {
        let mut trail = MemoryTrail::load(Rc::new(MemoryStorage::new()), "legal", t(0));
        trail.state.trail.clear();

        trail.record_message();
        assert_eq!(lenses(&trail), vec!["legal"]);
        assert_eq!(trail.trail()[0].message_count, 1);
        assert_eq!(trail.total_lens_count(), 2);
    }

    #[test]
    fn clear_keeps_current_lens_and_preference() {
        let store = MemoryStorage::new();
        let mut trail = MemoryTrail::load(Rc::new(store.clone()), "healthcare", t(0));
        trail.set_current_lens("finance", t(1));
        trail.record_message();
        assert!(!trail.toggle_memory_preserved());

        trail.clear_trail(t(2));
        assert_eq!(lenses(&trail), vec!["finance"]);
        assert_eq!(trail.trail()[0].message_count, 0);
        assert_eq!(trail.total_lens_count(), 1);
        assert!(!persisted(&store).memory_preserved);
    }

    #[test]
    fn summary_lists_other_lenses_when_preserved() {
        let store = MemoryStorage::new();
        let mut trail = MemoryTrail::load(Rc::new(store), "healthcare", t(0));
        assert_eq!(trail.context_summary(), None);

        trail.record_message();
        trail.set_current_lens("finance", t(1));
        trail.record_message();
        trail.record_message();
        trail.set_current_lens("legal", t(2));
        assert_eq!(
            trail.context_summary().as_deref(),
            Some("Previously visited: healthcare (1 message) -> finance (2 messages)")
        );

        trail.toggle_memory_preserved();
        assert_eq!(trail.context_summary(), None);
    }
}
