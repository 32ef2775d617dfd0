//! Proactive chat suggestions.
//!
//! [`ProactiveEngine`] is a clock-free state machine: every operation takes the
//! current local time, and pending timers are plain deadlines. A driver (see
//! [`use_proactive_chat`](crate::hooks::use_proactive_chat)) sleeps until
//! [`next_deadline`](ProactiveEngine::next_deadline) and then calls
//! [`fire_due`](ProactiveEngine::fire_due).
//!
//! Two timers exist:
//! - time-based: armed on mount and whenever the lens or the enabled flag
//!   changes; fires once, 2 s later, if the hour was in a morning or evening
//!   window when it was armed.
//! - idle: owned entirely by [`arm_idle`](ProactiveEngine::arm_idle), which
//!   every input change and [`reset_idle_timer`](ProactiveEngine::reset_idle_timer)
//!   go through; fires once, 30 s after the last arming, only if at least one
//!   chat message exists.

use std::ops::Range;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use concord_shared::{DtuAction, ProactiveMessage, ProactiveTrigger};

#[derive(Debug, Clone, PartialEq)]
pub struct ProactiveConfig {
    pub time_based_delay: Duration,
    pub idle_timeout: Duration,
    pub max_messages: usize,
    /// Local hours (half-open) that produce the morning suggestion.
    pub morning_hours: Range<u32>,
    /// Local hours (half-open) that produce the end-of-day suggestion.
    pub evening_hours: Range<u32>,
}

impl Default for ProactiveConfig {
    fn default() -> Self {
        Self {
            time_based_delay: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(30),
            max_messages: 5,
            morning_hours: 7..9,
            evening_hours: 17..19,
        }
    }
}

/// Inputs the consuming component passes in on every render.
#[derive(Debug, Clone, PartialEq)]
pub struct ProactiveOptions {
    pub current_lens: String,
    pub message_count: u32,
    pub enabled: bool,
}

impl ProactiveOptions {
    pub fn new(current_lens: impl Into<String>) -> Self {
        Self {
            current_lens: current_lens.into(),
            message_count: 0,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeSlot {
    Morning,
    Evening,
}

#[derive(Debug)]
pub struct ProactiveEngine {
    config: ProactiveConfig,
    options: Option<ProactiveOptions>,
    messages: Vec<ProactiveMessage>,
    time_timer: Option<(DateTime<FixedOffset>, TimeSlot)>,
    idle_deadline: Option<DateTime<FixedOffset>>,
}

impl ProactiveEngine {
    pub fn new(config: ProactiveConfig) -> Self {
        Self {
            config,
            options: None,
            messages: Vec::new(),
            time_timer: None,
            idle_deadline: None,
        }
    }

    pub fn messages(&self) -> &[ProactiveMessage] {
        &self.messages
    }

    pub fn is_mounted(&self) -> bool {
        self.options.is_some()
    }

    /// Start with `options`: arm the time-based and idle timers.
    pub fn mount(&mut self, options: ProactiveOptions, now: DateTime<FixedOffset>) {
        self.options = Some(options);
        self.arm_time_based(now);
        self.arm_idle(now);
    }

    /// Apply new inputs. Mounts on first use.
    pub fn update(&mut self, options: ProactiveOptions, now: DateTime<FixedOffset>) {
        let Some(previous) = self.options.replace(options.clone()) else {
            self.mount(options, now);
            return;
        };
        if previous == options {
            return;
        }

        if previous.current_lens != options.current_lens || previous.enabled != options.enabled {
            self.arm_time_based(now);
        }
        self.arm_idle(now);
    }

    /// Push the idle deadline out by the full idle timeout.
    pub fn reset_idle_timer(&mut self, now: DateTime<FixedOffset>) {
        self.arm_idle(now);
    }

    /// The single place the idle timer is (re)armed or cleared.
    fn arm_idle(&mut self, now: DateTime<FixedOffset>) {
        self.idle_deadline = match &self.options {
            Some(options) if options.enabled => Some(after(now, self.config.idle_timeout)),
            _ => None,
        };
    }

    fn arm_time_based(&mut self, now: DateTime<FixedOffset>) {
        self.time_timer = None;
        if !self.options.as_ref().is_some_and(|o| o.enabled) {
            return;
        }

        let hour = now.hour();
        let slot = if self.config.morning_hours.contains(&hour) {
            TimeSlot::Morning
        } else if self.config.evening_hours.contains(&hour) {
            TimeSlot::Evening
        } else {
            return;
        };
        self.time_timer = Some((after(now, self.config.time_based_delay), slot));
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<DateTime<FixedOffset>> {
        let time = self.time_timer.map(|(at, _)| at);
        match (time, self.idle_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire every timer whose deadline has passed. Returns how many messages
    /// were added.
    pub fn fire_due(&mut self, now: DateTime<FixedOffset>) -> usize {
        let Some(options) = self.options.clone() else {
            return 0;
        };
        let mut added = 0;

        if let Some((at, slot)) = self.time_timer {
            if at <= now {
                self.time_timer = None;
                let content = match slot {
                    TimeSlot::Morning => format!(
                        "Good morning! Want a quick briefing on what's new in {}?",
                        options.current_lens
                    ),
                    TimeSlot::Evening => format!(
                        "End of day: want me to recap what we covered in {} today?",
                        options.current_lens
                    ),
                };
                if self.push_timer_message(ProactiveTrigger::TimeBased, content, now) {
                    added += 1;
                }
            }
        }

        if let Some(at) = self.idle_deadline {
            if at <= now {
                self.idle_deadline = None;
                if options.enabled && options.message_count > 0 {
                    let content = format!(
                        "Still thinking it over? I can summarize our {} conversation or suggest a next step.",
                        options.current_lens
                    );
                    if self.push_timer_message(ProactiveTrigger::Idle, content, now) {
                        added += 1;
                    }
                }
            }
        }

        added
    }

    /// Append a notification about a DTU lifecycle event.
    pub fn add_dtu_notification(
        &mut self,
        title: &str,
        action: DtuAction,
        now: DateTime<FixedOffset>,
    ) -> &ProactiveMessage {
        let content = match action {
            DtuAction::Promoted => {
                format!("DTU \"{title}\" was promoted and is now visible globally.")
            }
            action => format!("DTU \"{title}\" was {action}."),
        };
        self.push(ProactiveMessage::new(
            ProactiveTrigger::DtuEvent,
            content,
            now.with_timezone(&Utc),
        ))
    }

    /// Timer suggestions are skipped when the same text is already showing.
    fn push_timer_message(
        &mut self,
        trigger: ProactiveTrigger,
        content: String,
        now: DateTime<FixedOffset>,
    ) -> bool {
        if self.messages.iter().any(|m| m.content == content) {
            return false;
        }
        self.push(ProactiveMessage::new(trigger, content, now.with_timezone(&Utc)));
        true
    }

    fn push(&mut self, message: ProactiveMessage) -> &ProactiveMessage {
        self.messages.push(message);
        if self.messages.len() > self.config.max_messages {
            let excess = self.messages.len() - self.config.max_messages;
            self.messages.drain(..excess);
        }
        &self.messages[self.messages.len() - 1]
    }

    /// Returns whether a message was removed.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    pub fn dismiss_all(&mut self) {
        self.messages.clear();
    }

    /// Clear both timers (unmount). Messages are kept.
    pub fn teardown(&mut self) {
        self.time_timer = None;
        self.idle_deadline = None;
        self.options = None;
    }
}

fn after(now: DateTime<FixedOffset>, delay: Duration) -> DateTime<FixedOffset> {
    now + chrono::Duration::milliseconds(delay.as_millis() as i64)
}

impl Default for ProactiveEngine {
    fn default() -> Self {
        Self::new(ProactiveConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 2, hour, minute, 0)
            .unwrap()
    }

    fn secs(s: f64) -> chrono::Duration {
        chrono::Duration::milliseconds((s * 1000.0) as i64)
    }

    fn options(lens: &str, message_count: u32) -> ProactiveOptions {
        ProactiveOptions {
            current_lens: lens.to_string(),
            message_count,
            enabled: true,
        }
    }

    #[test]
    fn morning_suggestion_after_two_seconds() {
        let start = at(8, 0);
        let mut engine = ProactiveEngine::default();
        engine.mount(options("healthcare", 0), start);

        assert_eq!(engine.fire_due(start + secs(1.0)), 0);
        assert_eq!(engine.fire_due(start + secs(2.5)), 1);

        let messages = engine.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].trigger, ProactiveTrigger::TimeBased);
        assert!(messages[0].content.contains("morning"));

        // Once per mount, and idle never fires without messages.
        assert_eq!(engine.fire_due(start + secs(120.0)), 0);
        assert_eq!(engine.messages().len(), 1);
    }

    #[test]
    fn evening_suggestion_mentions_end_of_day() {
        let start = at(17, 30);
        let mut engine = ProactiveEngine::default();
        engine.mount(options("finance", 0), start);
        engine.fire_due(start + secs(2.0));
        assert!(engine.messages()[0].content.contains("End of day"));
    }

    #[test]
    fn no_time_suggestion_outside_windows_or_when_disabled() {
        for hour in [6, 9, 12, 16, 19, 23] {
            let mut engine = ProactiveEngine::default();
            engine.mount(options("finance", 0), at(hour, 0));
            assert_eq!(engine.next_deadline(), Some(at(hour, 0) + secs(30.0)));
            assert_eq!(engine.fire_due(at(hour, 0) + secs(5.0)), 0, "hour {hour}");
        }

        let mut engine = ProactiveEngine::default();
        let mut disabled = options("finance", 3);
        disabled.enabled = false;
        engine.mount(disabled, at(8, 0));
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn lens_change_rearms_time_suggestion() {
        let start = at(7, 15);
        let mut engine = ProactiveEngine::default();
        engine.mount(options("healthcare", 0), start);
        engine.fire_due(start + secs(3.0));

        let later = start + secs(10.0);
        engine.update(options("finance", 0), later);
        assert_eq!(engine.fire_due(later + secs(2.0)), 1);
        assert_eq!(engine.messages().len(), 2);
        assert!(engine.messages()[1].content.contains("finance"));
    }

    #[test]
    fn idle_requires_messages() {
        let start = at(12, 0);
        let mut engine = ProactiveEngine::default();
        engine.mount(options("legal", 0), start);
        assert_eq!(engine.fire_due(start + secs(31.0)), 0);

        let mut engine = ProactiveEngine::default();
        engine.mount(options("legal", 2), start);
        assert_eq!(engine.fire_due(start + secs(29.0)), 0);
        assert_eq!(engine.fire_due(start + secs(30.0)), 1);
        assert_eq!(engine.messages()[0].trigger, ProactiveTrigger::Idle);
    }

    #[test]
    fn new_messages_push_idle_deadline_out() {
        let start = at(12, 0);
        let mut engine = ProactiveEngine::default();
        engine.mount(options("legal", 1), start);

        engine.update(options("legal", 2), start + secs(20.0));
        assert_eq!(engine.fire_due(start + secs(35.0)), 0);
        assert_eq!(engine.next_deadline(), Some(start + secs(50.0)));

        engine.reset_idle_timer(start + secs(45.0));
        assert_eq!(engine.fire_due(start + secs(60.0)), 0);
        assert_eq!(engine.fire_due(start + secs(75.0)), 1);
    }

    #[test]
    fn unchanged_inputs_do_not_rearm() {
        let start = at(12, 0);
        let mut engine = ProactiveEngine::default();
        engine.mount(options("legal", 1), start);
        engine.update(options("legal", 1), start + secs(20.0));
        assert_eq!(engine.next_deadline(), Some(start + secs(30.0)));
    }

    #[test]
    fn dtu_notifications_cap_at_five_oldest_first() {
        let now = at(12, 0);
        let mut engine = ProactiveEngine::default();
        let mut first_id = String::new();
        for i in 0..7 {
            let id = engine
                .add_dtu_notification(&format!("DTU {i}"), DtuAction::Created, now)
                .id
                .clone();
            if i == 0 {
                first_id = id;
            }
            assert_eq!(engine.messages().len(), (i + 1).min(5));
        }
        assert!(engine.messages().iter().all(|m| m.id != first_id));
        assert!(engine.messages()[0].content.contains("DTU 2"));
        assert!(engine.messages()[4].content.contains("DTU 6"));
    }

    #[test]
    fn promoted_notification_mentions_global_visibility() {
        let mut engine = ProactiveEngine::default();
        let message = engine.add_dtu_notification("Promoted DTU", DtuAction::Promoted, at(12, 0));
        assert_eq!(message.trigger, ProactiveTrigger::DtuEvent);
        assert!(message.content.contains("promoted"));
        assert!(message.content.contains("globally"));

        let message = engine.add_dtu_notification("Draft", DtuAction::Created, at(12, 0));
        assert!(message.content.contains("created"));
    }

    #[test]
    fn unknown_actions_are_named_verbatim() {
        let mut engine = ProactiveEngine::default();
        let message =
            engine.add_dtu_notification("Tide tables", DtuAction::from_name("merged"), at(12, 0));
        assert_eq!(message.content, "DTU \"Tide tables\" was merged.");
    }

    #[test]
    fn identical_timer_suggestions_are_not_duplicated() {
        let start = at(8, 0);
        let mut engine = ProactiveEngine::default();
        engine.mount(options("healthcare", 0), start);
        engine.fire_due(start + secs(2.0));

        engine.update(options("finance", 0), start + secs(3.0));
        engine.update(options("healthcare", 0), start + secs(4.0));
        assert_eq!(engine.fire_due(start + secs(6.0)), 0);
        assert_eq!(engine.messages().len(), 1);
    }

    #[test]
    fn dismiss_and_teardown() {
        let now = at(12, 0);
        let mut engine = ProactiveEngine::default();
        engine.mount(options("legal", 1), now);
        let id = engine
            .add_dtu_notification("A", DtuAction::Updated, now)
            .id
            .clone();
        engine.add_dtu_notification("B", DtuAction::Archived, now);

        assert!(engine.dismiss(&id));
        assert!(!engine.dismiss(&id));
        assert_eq!(engine.messages().len(), 1);

        engine.dismiss_all();
        assert!(engine.messages().is_empty());

        engine.teardown();
        assert_eq!(engine.next_deadline(), None);
        assert_eq!(engine.fire_due(now + secs(60.0)), 0);
        assert!(!engine.is_mounted());
    }
}
