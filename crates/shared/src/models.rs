//! Data models shared between the client core and its persisted/REST formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Proactive chat ---

/// What produced a proactive message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProactiveTrigger {
    TimeBased,
    Idle,
    DtuEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProactiveMessage {
    pub id: String,
    pub trigger: ProactiveTrigger,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ProactiveMessage {
    pub fn new(trigger: ProactiveTrigger, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("proactive-{}", uuid::Uuid::new_v4()),
            trigger,
            content: content.into(),
            created_at,
        }
    }
}

/// Lifecycle action reported for a DTU.
///
/// Names the client does not know are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DtuAction {
    Created,
    Updated,
    Promoted,
    Archived,
    Other(String),
}

impl DtuAction {
    pub fn as_str(&self) -> &str {
        match self {
            DtuAction::Created => "created",
            DtuAction::Updated => "updated",
            DtuAction::Promoted => "promoted",
            DtuAction::Archived => "archived",
            DtuAction::Other(name) => name,
        }
    }

    /// Parse a wire action name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "created" => DtuAction::Created,
            "updated" => DtuAction::Updated,
            "promoted" => DtuAction::Promoted,
            "archived" => DtuAction::Archived,
            other => DtuAction::Other(other.to_string()),
        }
    }
}

impl From<String> for DtuAction {
    fn from(name: String) -> Self {
        DtuAction::from_name(&name)
    }
}

impl From<DtuAction> for String {
    fn from(action: DtuAction) -> Self {
        match action {
            DtuAction::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for DtuAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Cross-lens memory ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LensTrailEntry {
    pub lens: String,
    pub entered_at: DateTime<Utc>,
    pub message_count: u32,
}

impl LensTrailEntry {
    pub fn new(lens: impl Into<String>, entered_at: DateTime<Utc>) -> Self {
        Self {
            lens: lens.into(),
            entered_at,
            message_count: 0,
        }
    }
}

/// Session-persisted visit history across lenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossLensMemory {
    #[serde(default)]
    pub trail: Vec<LensTrailEntry>,
    /// Distinct lenses visited this session, not the trail length.
    #[serde(default)]
    pub total_lens_count: u32,
    #[serde(default = "default_memory_preserved")]
    pub memory_preserved: bool,
}

fn default_memory_preserved() -> bool {
    true
}

impl Default for CrossLensMemory {
    fn default() -> Self {
        Self {
            trail: Vec::new(),
            total_lens_count: 0,
            memory_preserved: default_memory_preserved(),
        }
    }
}

// --- Media / CDN ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaQuality {
    #[default]
    Original,
    Hd,
    Sd,
    Thumbnail,
}

impl MediaQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaQuality::Original => "original",
            MediaQuality::Hd => "hd",
            MediaQuality::Sd => "sd",
            MediaQuality::Thumbnail => "thumbnail",
        }
    }

    /// Value of the `quality` query parameter, if this quality needs one.
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            MediaQuality::Hd | MediaQuality::Sd => Some(self.as_str()),
            MediaQuality::Original | MediaQuality::Thumbnail => None,
        }
    }
}

/// Response of `GET /api/cdn/info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnInfo {
    #[serde(default, alias = "configured")]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

impl CdnInfo {
    /// CDN base URL when the CDN is both enabled and has a usable base.
    pub fn active_base(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.base_url
            .as_deref()
            .map(|b| b.trim_end_matches('/'))
            .filter(|b| !b.is_empty())
    }
}

/// Response of `GET /api/cdn/signed-url/{hash}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    pub url: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trips_camel_case() {
        let json = r#"{
            "trail": [{"lens":"healthcare","enteredAt":"2026-03-02T08:00:00Z","messageCount":3}],
            "totalLensCount": 1,
            "memoryPreserved": false
        }"#;
        let memory: CrossLensMemory = serde_json::from_str(json).unwrap();
        assert_eq!(memory.trail[0].lens, "healthcare");
        assert_eq!(memory.trail[0].message_count, 3);
        assert!(!memory.memory_preserved);

        let back = serde_json::to_value(&memory).unwrap();
        assert_eq!(back["totalLensCount"], 1);
        assert_eq!(back["trail"][0]["messageCount"], 3);
    }

    #[test]
    fn memory_defaults_to_preserved() {
        let memory: CrossLensMemory = serde_json::from_str("{}").unwrap();
        assert!(memory.trail.is_empty());
        assert!(memory.memory_preserved);
    }

    #[test]
    fn only_hd_and_sd_add_a_quality_parameter() {
        assert_eq!(MediaQuality::Hd.query_value(), Some("hd"));
        assert_eq!(MediaQuality::Sd.query_value(), Some("sd"));
        assert_eq!(MediaQuality::Original.query_value(), None);
        assert_eq!(MediaQuality::Thumbnail.query_value(), None);
    }

    #[test]
    fn cdn_needs_enabled_flag_and_base() {
        let cdn: CdnInfo =
            serde_json::from_str(r#"{"configured":true,"baseUrl":"https://cdn.example.com/"}"#)
                .unwrap();
        assert_eq!(cdn.active_base(), Some("https://cdn.example.com"));

        let disabled = CdnInfo {
            enabled: false,
            ..cdn.clone()
        };
        assert_eq!(disabled.active_base(), None);

        let no_base = CdnInfo {
            base_url: Some(String::new()),
            ..cdn
        };
        assert_eq!(no_base.active_base(), None);
    }

    #[test]
    fn unknown_dtu_actions_keep_their_name() {
        assert_eq!(DtuAction::from_name("promoted"), DtuAction::Promoted);
        let merged = DtuAction::from_name("merged");
        assert_eq!(merged, DtuAction::Other("merged".to_string()));
        assert_eq!(merged.to_string(), "merged");

        let parsed: DtuAction = serde_json::from_str(r#""archived""#).unwrap();
        assert_eq!(parsed, DtuAction::Archived);
        assert_eq!(serde_json::to_value(&merged).unwrap(), "merged");
    }

    #[test]
    fn proactive_ids_are_unique() {
        let now = Utc::now();
        let a = ProactiveMessage::new(ProactiveTrigger::Idle, "a", now);
        let b = ProactiveMessage::new(ProactiveTrigger::Idle, "a", now);
        assert_ne!(a.id, b.id);
        assert_eq!(
            serde_json::to_value(ProactiveTrigger::TimeBased).unwrap(),
            "time_based"
        );
    }
}
