//! Real-time protocol between the Concord client and the cognitive-engine backend.
//!
//! Every message on the socket is a JSON [`Frame`] of the form
//! `{"event": "<name>", "data": <payload>}`. Event names are conventions shared
//! with the backend; [`EventKind`] lists the ones this client knows about and
//! [`ServerEvent`] / [`ClientCommand`] give each of them a typed payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::DtuAction;

pub const EVENT_CONNECT: &str = "connect";
pub const EVENT_DISCONNECT: &str = "disconnect";
pub const EVENT_CONNECT_ERROR: &str = "connect_error";
pub const EVENT_RESONANCE_UPDATE: &str = "resonance:update";
pub const EVENT_DTU_UPDATE: &str = "dtu:update";
pub const EVENT_DTU_SUBSCRIBE: &str = "dtu:subscribe";
pub const EVENT_DTU_UNSUBSCRIBE: &str = "dtu:unsubscribe";
pub const EVENT_DREAM_CAPTURED: &str = "dream:captured";
pub const EVENT_CREATIVE_REGISTRY_UPDATE: &str = "creative_registry:update";
/// Prefix shared by every collaborative-session event (`shared-session:join`, ...).
pub const SHARED_SESSION_PREFIX: &str = "shared-session:";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("invalid payload for '{event}': {reason}")]
    Payload { event: String, reason: String },
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

/// Kind of a real-time event, used as the key for handler registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    ConnectError,
    ResonanceUpdate,
    DtuUpdate,
    DreamCaptured,
    /// Any `shared-session:*` event.
    SharedSession,
    CreativeRegistryUpdate,
    DtuSubscribe,
    DtuUnsubscribe,
    Other(String),
}

impl EventKind {
    /// Map a wire event name to its kind. Unknown names are kept as [`EventKind::Other`].
    pub fn from_name(name: &str) -> Self {
        match name {
            EVENT_CONNECT => EventKind::Connect,
            EVENT_DISCONNECT => EventKind::Disconnect,
            EVENT_CONNECT_ERROR => EventKind::ConnectError,
            EVENT_RESONANCE_UPDATE => EventKind::ResonanceUpdate,
            EVENT_DTU_UPDATE => EventKind::DtuUpdate,
            EVENT_DREAM_CAPTURED => EventKind::DreamCaptured,
            EVENT_CREATIVE_REGISTRY_UPDATE => EventKind::CreativeRegistryUpdate,
            EVENT_DTU_SUBSCRIBE => EventKind::DtuSubscribe,
            EVENT_DTU_UNSUBSCRIBE => EventKind::DtuUnsubscribe,
            n if n.starts_with(SHARED_SESSION_PREFIX) => EventKind::SharedSession,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// Wire name. `SharedSession` reports its wildcard pattern.
    pub fn name(&self) -> &str {
        match self {
            EventKind::Connect => EVENT_CONNECT,
            EventKind::Disconnect => EVENT_DISCONNECT,
            EventKind::ConnectError => EVENT_CONNECT_ERROR,
            EventKind::ResonanceUpdate => EVENT_RESONANCE_UPDATE,
            EventKind::DtuUpdate => EVENT_DTU_UPDATE,
            EventKind::DreamCaptured => EVENT_DREAM_CAPTURED,
            EventKind::SharedSession => "shared-session:*",
            EventKind::CreativeRegistryUpdate => EVENT_CREATIVE_REGISTRY_UPDATE,
            EventKind::DtuSubscribe => EVENT_DTU_SUBSCRIBE,
            EventKind::DtuUnsubscribe => EVENT_DTU_UNSUBSCRIBE,
            EventKind::Other(name) => name,
        }
    }

    /// Events produced by the transport itself rather than the backend.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            EventKind::Connect | EventKind::Disconnect | EventKind::ConnectError
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One message on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    pub fn to_text(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.event)
    }
}

// --- Server -> client payloads ---

/// Latest resonance metrics pushed by the backend. The metric set is
/// backend-defined, so values are kept by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResonanceUpdate {
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
}

impl ResonanceUpdate {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtuUpdate {
    #[serde(alias = "dtuId")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DtuUpdate {
    pub fn dtu_action(&self) -> Option<DtuAction> {
        self.action.as_deref().map(DtuAction::from_name)
    }

    /// Title if present, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamCaptured {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed server event decoded from a [`Frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    ResonanceUpdate(ResonanceUpdate),
    DtuUpdate(DtuUpdate),
    DreamCaptured(DreamCaptured),
    /// `shared-session:<action>`
    SharedSession { action: String, payload: Value },
    CreativeRegistryUpdate(Value),
    Other { event: String, data: Value },
}

impl ServerEvent {
    pub fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        let Frame { event, data } = frame;
        match EventKind::from_name(&event) {
            EventKind::ResonanceUpdate => {
                payload::<ResonanceUpdate>(&event, data).map(ServerEvent::ResonanceUpdate)
            }
            EventKind::DtuUpdate => payload::<DtuUpdate>(&event, data).map(ServerEvent::DtuUpdate),
            EventKind::DreamCaptured => {
                payload::<DreamCaptured>(&event, data).map(ServerEvent::DreamCaptured)
            }
            EventKind::SharedSession => Ok(ServerEvent::SharedSession {
                action: event[SHARED_SESSION_PREFIX.len()..].to_string(),
                payload: data,
            }),
            EventKind::CreativeRegistryUpdate => Ok(ServerEvent::CreativeRegistryUpdate(data)),
            EventKind::Other(_) => Ok(ServerEvent::Other { event, data }),
            kind => Err(ProtocolError::Payload {
                event,
                reason: format!("'{kind}' is not a server event"),
            }),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::ResonanceUpdate(_) => EventKind::ResonanceUpdate,
            ServerEvent::DtuUpdate(_) => EventKind::DtuUpdate,
            ServerEvent::DreamCaptured(_) => EventKind::DreamCaptured,
            ServerEvent::SharedSession { .. } => EventKind::SharedSession,
            ServerEvent::CreativeRegistryUpdate(_) => EventKind::CreativeRegistryUpdate,
            ServerEvent::Other { event, .. } => EventKind::Other(event.clone()),
        }
    }
}

/// Decode a payload, treating a missing (`null`) payload as an empty object.
fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, ProtocolError> {
    let data = if data.is_null() {
        Value::Object(Map::new())
    } else {
        data
    };
    serde_json::from_value(data).map_err(|e| ProtocolError::Payload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

// --- Client -> server commands ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientCommand {
    #[serde(rename = "dtu:subscribe")]
    DtuSubscribe {
        #[serde(rename = "dtuId")]
        dtu_id: String,
    },
    #[serde(rename = "dtu:unsubscribe")]
    DtuUnsubscribe {
        #[serde(rename = "dtuId")]
        dtu_id: String,
    },
    /// Any other event, sent as-is.
    #[serde(skip)]
    Custom { event: String, data: Value },
}

impl ClientCommand {
    pub fn kind(&self) -> EventKind {
        match self {
            ClientCommand::DtuSubscribe { .. } => EventKind::DtuSubscribe,
            ClientCommand::DtuUnsubscribe { .. } => EventKind::DtuUnsubscribe,
            ClientCommand::Custom { event, .. } => EventKind::from_name(event),
        }
    }

    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        if let ClientCommand::Custom { event, data } = self {
            return Ok(Frame::new(event.clone(), data.clone()));
        }
        let value = serde_json::to_value(self).map_err(|e| ProtocolError::Encode(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

// --- What subscribers receive ---

/// Event delivered to handlers registered on the socket manager.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Connect,
    Disconnect { reason: String },
    ConnectError { message: String },
    Server(ServerEvent),
}

impl SocketEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SocketEvent::Connect => EventKind::Connect,
            SocketEvent::Disconnect { .. } => EventKind::Disconnect,
            SocketEvent::ConnectError { .. } => EventKind::ConnectError,
            SocketEvent::Server(event) => event.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_names_map_to_kinds() {
        assert_eq!(EventKind::from_name("resonance:update"), EventKind::ResonanceUpdate);
        assert_eq!(EventKind::from_name("connect_error"), EventKind::ConnectError);
        assert_eq!(EventKind::from_name("shared-session:join"), EventKind::SharedSession);
        assert_eq!(
            EventKind::from_name("lens:refresh"),
            EventKind::Other("lens:refresh".to_string())
        );
        assert_eq!(EventKind::DtuSubscribe.name(), "dtu:subscribe");
        assert!(EventKind::Disconnect.is_system());
        assert!(!EventKind::DtuUpdate.is_system());
    }

    #[test]
    fn subscribe_command_encodes_as_frame() {
        let frame = ClientCommand::DtuSubscribe {
            dtu_id: "dtu-42".to_string(),
        }
        .to_frame()
        .unwrap();
        assert_eq!(frame.event, "dtu:subscribe");
        assert_eq!(frame.data, json!({ "dtuId": "dtu-42" }));
    }

    #[test]
    fn custom_command_passes_through() {
        let command = ClientCommand::Custom {
            event: "lens:focus".to_string(),
            data: json!({ "lens": "finance" }),
        };
        assert_eq!(command.kind(), EventKind::Other("lens:focus".to_string()));
        let frame = command.to_frame().unwrap();
        assert_eq!(frame.event, "lens:focus");
        assert_eq!(frame.data["lens"], "finance");
    }

    #[test]
    fn dtu_update_keeps_unknown_fields() {
        let frame = Frame::parse(
            r#"{"event":"dtu:update","data":{"dtuId":"d1","title":"Tide tables","tier":"mega"}}"#,
        )
        .unwrap();
        let ServerEvent::DtuUpdate(update) = ServerEvent::from_frame(frame).unwrap() else {
            panic!("expected a DTU update");
        };
        assert_eq!(update.id, "d1");
        assert_eq!(update.title.as_deref(), Some("Tide tables"));
        assert_eq!(update.extra.get("tier"), Some(&json!("mega")));
        assert_eq!(update.dtu_action(), None);
        assert_eq!(update.display_name(), "Tide tables");
    }

    #[test]
    fn dtu_update_action_names_are_not_collapsed() {
        let update: DtuUpdate =
            serde_json::from_value(json!({ "id": "d2", "action": "forked" })).unwrap();
        assert_eq!(update.dtu_action(), Some(DtuAction::Other("forked".to_string())));
        assert_eq!(update.display_name(), "d2");
    }

    #[test]
    fn shared_session_events_carry_their_action() {
        let frame = Frame::new("shared-session:cursor", json!({ "x": 3 }));
        let event = ServerEvent::from_frame(frame).unwrap();
        assert_eq!(
            event,
            ServerEvent::SharedSession {
                action: "cursor".to_string(),
                payload: json!({ "x": 3 }),
            }
        );
        assert_eq!(event.kind(), EventKind::SharedSession);
    }

    #[test]
    fn resonance_without_payload_is_empty() {
        let frame = Frame::parse(r#"{"event":"resonance:update"}"#).unwrap();
        let event = ServerEvent::from_frame(frame).unwrap();
        assert_eq!(event, ServerEvent::ResonanceUpdate(ResonanceUpdate::default()));
    }

    #[test]
    fn rejects_bad_payloads_and_system_names() {
        let bad = Frame::new("dtu:update", json!("not an object"));
        assert!(matches!(
            ServerEvent::from_frame(bad),
            Err(ProtocolError::Payload { .. })
        ));

        let system = Frame::new("connect", Value::Null);
        assert!(ServerEvent::from_frame(system).is_err());

        assert!(matches!(
            Frame::parse("{not json"),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
