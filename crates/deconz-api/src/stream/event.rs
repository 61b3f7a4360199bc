// ── Gateway event payloads ──
//
// Every websocket frame the gateway pushes is a JSON object of the shape
// `{"t": "event", "e": "changed", "r": "lights", "id": "1", ...}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tracing::debug;

use crate::resources::ResourceKind;

/// What happened to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ChangeKind {
    Added,
    Changed,
    Deleted,
    SceneCalled,
    #[serde(other)]
    Other,
}

/// A parsed event-stream message.
///
/// Fields beyond the routing keys (`state`, `config`, `attr`, `uniqueid`,
/// `gid`, `scid`, ...) are kept in `extra` so nothing is dropped. The
/// `e`/`r` strings are kept as sent, so kinds this crate does not model
/// survive a round trip through [`to_json`](Self::to_json).
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    /// Message type; `"event"` for all stream traffic.
    pub message_type: String,
    pub change: ChangeKind,
    pub resource: ResourceKind,
    pub id: Option<String>,
    pub extra: Map<String, Value>,
    change_name: String,
    resource_name: String,
}

#[derive(Deserialize)]
struct WireEvent {
    #[serde(rename = "t")]
    message_type: String,
    #[serde(rename = "e")]
    change: String,
    #[serde(rename = "r")]
    resource: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl GatewayEvent {
    /// Parse a raw frame, returning `None` (and logging) if it is not a
    /// well-formed event.
    pub fn parse(payload: &str) -> Option<Self> {
        match serde_json::from_str::<WireEvent>(payload) {
            Ok(wire) => Some(Self::from_wire(wire)),
            Err(e) => {
                debug!(error = %e, "ignoring malformed stream payload");
                None
            }
        }
    }

    fn from_wire(wire: WireEvent) -> Self {
        let change = serde_json::from_value(Value::String(wire.change.clone()))
            .unwrap_or(ChangeKind::Other);
        let resource = serde_json::from_value(Value::String(wire.resource.clone()))
            .unwrap_or(ResourceKind::Other);
        Self {
            message_type: wire.message_type,
            change,
            resource,
            id: wire.id,
            extra: wire.extra,
            change_name: wire.change,
            resource_name: wire.resource,
        }
    }

    pub fn is_event(&self) -> bool {
        self.message_type == "event"
    }

    /// The `e` value exactly as the gateway sent it.
    pub fn change_name(&self) -> &str {
        &self.change_name
    }

    /// The `r` value exactly as the gateway sent it.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// The event as the JSON object the gateway sent.
    pub fn to_json(&self) -> Value {
        let mut object = self.extra.clone();
        object.insert("t".into(), Value::String(self.message_type.clone()));
        object.insert("e".into(), Value::String(self.change_name.clone()));
        object.insert("r".into(), Value::String(self.resource_name.clone()));
        if let Some(id) = &self.id {
            object.insert("id".into(), Value::String(id.clone()));
        }
        Value::Object(object)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_changed_light_event() {
        let raw = r#"{"t":"event","e":"changed","r":"lights","id":"1","state":{"on":true,"bri":200}}"#;
        let event = GatewayEvent::parse(raw).unwrap();
        assert!(event.is_event());
        assert_eq!(event.change, ChangeKind::Changed);
        assert_eq!(event.resource, ResourceKind::Lights);
        assert_eq!(event.id.as_deref(), Some("1"));
        assert_eq!(event.extra["state"]["bri"], 200);
    }

    #[test]
    fn scene_called_without_id() {
        let raw = r#"{"t":"event","e":"scene-called","r":"scenes","gid":"2","scid":"1"}"#;
        let event = GatewayEvent::parse(raw).unwrap();
        assert_eq!(event.change, ChangeKind::SceneCalled);
        assert_eq!(event.resource, ResourceKind::Scenes);
        assert!(event.id.is_none());
        assert_eq!(event.extra["gid"], "2");
    }

    #[test]
    fn unknown_kinds_are_preserved_as_other() {
        let raw = r#"{"t":"event","e":"renamed","r":"alarmsystems","id":"1"}"#;
        let event = GatewayEvent::parse(raw).unwrap();
        assert_eq!(event.change, ChangeKind::Other);
        assert_eq!(event.resource, ResourceKind::Other);
        assert_eq!(event.change_name(), "renamed");
        assert_eq!(event.resource_name(), "alarmsystems");
    }

    #[test]
    fn to_json_keeps_unknown_kinds_verbatim() {
        let raw = json!({"t":"event","e":"renamed","r":"alarmsystems","id":"1","attr":{"name":"Home"}});
        let event = GatewayEvent::parse(&raw.to_string()).unwrap();
        assert_eq!(event.to_json(), raw);
    }

    #[test]
    fn malformed_payloads_are_ignored() {
        assert!(GatewayEvent::parse("not json").is_none());
        assert!(GatewayEvent::parse(r#"{"t":"event"}"#).is_none());
    }

    #[test]
    fn to_json_restores_wire_shape() {
        let raw = json!({"t":"event","e":"changed","r":"sensors","id":"5","state":{"buttonevent":1002}});
        let event = GatewayEvent::parse(&raw.to_string()).unwrap();
        assert_eq!(event.to_json(), raw);
    }

    #[test]
    fn change_kind_round_trips_through_strings() {
        assert_eq!("scene-called".parse::<ChangeKind>().unwrap(), ChangeKind::SceneCalled);
        assert_eq!(ChangeKind::SceneCalled.to_string(), "scene-called");
    }
}
