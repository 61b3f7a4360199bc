// Gateway wire models
//
// Serde types for the REST envelopes the gateway sends back. Mutating
// calls answer with a list of `{"success": {...}}` / `{"error": {...}}`
// entries; reads return plain objects keyed by resource id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of a `[{"success": ...}, {"error": ...}]` reply list.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayReply {
    #[serde(default)]
    pub success: Option<Value>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

/// The `error` object of a reply entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

/// Success payload of the key acquisition call: `{"username": "<key>"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuedKey {
    pub username: String,
}

/// Summary fields shared by light and sensor resources.
///
/// Everything else the gateway reports is kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawResource {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub modelid: String,
    #[serde(default)]
    pub manufacturername: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A group as listed by `GET /groups`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGroup {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
