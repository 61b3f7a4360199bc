// Light, sensor and group endpoints
//
// Reads return the gateway's JSON as-is; picker listings are reduced to
// `ResourceOption` rows. Light state updates are flattened from the
// `[{"success": {"/lights/1/state/on": true}}]` shape into `{"on": true}`.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::client::GatewayClient;
use crate::error::Error;
use crate::models::{GatewayReply, RawGroup, RawResource};

/// Resource collections exposed by the gateway.
///
/// Serialized the way the event stream spells them (`"lights"`), parsed
/// leniently from either the singular or plural form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum ResourceKind {
    #[strum(to_string = "lights", serialize = "light")]
    Lights,
    #[strum(to_string = "sensors", serialize = "sensor")]
    Sensors,
    #[strum(to_string = "groups", serialize = "group")]
    Groups,
    #[strum(to_string = "scenes", serialize = "scene")]
    Scenes,
    /// Anything newer firmware sends that we don't model.
    #[serde(other)]
    #[strum(to_string = "other")]
    Other,
}

impl ResourceKind {
    /// REST collection path, e.g. `/lights`.
    pub fn path(self) -> String {
        format!("/{self}")
    }
}

/// One selectable row for a resource picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOption {
    pub name: String,
    /// `"<id>:<name>"`; see [`resource_id`].
    pub value: String,
    /// `"<type> | <modelid> | <manufacturername>"`.
    pub description: String,
}

impl ResourceOption {
    fn from_raw(id: &str, raw: &RawResource) -> Self {
        Self {
            name: raw.name.clone(),
            value: format!("{id}:{}", raw.name),
            description: format!(
                "{} | {} | {}",
                raw.kind, raw.modelid, raw.manufacturername
            ),
        }
    }
}

/// Extract the resource id from a picker value (`"3:Kitchen"` -> `"3"`).
pub fn resource_id(value: &str) -> &str {
    value.split_once(':').map_or(value, |(id, _)| id)
}

/// Writable light state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightStateUpdate {
    pub on: bool,
    /// Brightness, 1..=254. Depending on the light, 1 may still be visible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
}

impl LightStateUpdate {
    pub fn new(on: bool) -> Self {
        Self { on, bri: None }
    }

    pub fn with_brightness(mut self, bri: u8) -> Self {
        self.bri = Some(bri);
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        match self.bri {
            Some(bri) if !(1..=254).contains(&bri) => Err(Error::InvalidArgument(format!(
                "brightness must be within 1..=254, got {bri}"
            ))),
            _ => Ok(()),
        }
    }
}

impl GatewayClient {
    /// List lights or sensors as picker rows, ordered by numeric id.
    ///
    /// `GET /api/{token}/lights` or `/sensors`
    pub async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<ResourceOption>, Error> {
        debug!(%kind, "listing resources");
        let raw: Map<String, Value> = self
            .request(Method::GET, &kind.path(), None, &[])
            .await?;

        let mut rows: Vec<(String, RawResource)> = raw
            .into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(res) => Some((id, res)),
                Err(e) => {
                    warn!(%kind, id = %id, error = %e, "skipping malformed resource");
                    None
                }
            })
            .collect();
        rows.sort_by(|(a, _), (b, _)| id_order(a, b));

        Ok(rows
            .iter()
            .map(|(id, res)| ResourceOption::from_raw(id, res))
            .collect())
    }

    /// List groups as picker rows whose value is the bare group id.
    ///
    /// `GET /api/{token}/groups`
    pub async fn list_groups(&self) -> Result<Vec<ResourceOption>, Error> {
        let raw: Map<String, Value> = self.request(Method::GET, "/groups", None, &[]).await?;

        let mut rows: Vec<(String, RawGroup)> = raw
            .into_iter()
            .filter_map(|(id, value)| serde_json::from_value(value).ok().map(|g| (id, g)))
            .collect();
        rows.sort_by(|(a, _), (b, _)| id_order(a, b));

        Ok(rows
            .into_iter()
            .map(|(id, group)| ResourceOption {
                name: group.name,
                value: id,
                description: String::new(),
            })
            .collect())
    }

    /// Read one resource as raw JSON.
    ///
    /// `GET /api/{token}/{kind}/{id}`
    pub async fn get_resource(&self, kind: ResourceKind, id: &str) -> Result<Value, Error> {
        let path = format!("{}/{id}", kind.path());
        debug!(%path, "reading resource");
        self.request(Method::GET, &path, None, &[]).await
    }

    pub async fn get_light(&self, id: &str) -> Result<Value, Error> {
        self.get_resource(ResourceKind::Lights, id).await
    }

    pub async fn get_sensor(&self, id: &str) -> Result<Value, Error> {
        self.get_resource(ResourceKind::Sensors, id).await
    }

    /// Update a light's state and return the applied attributes.
    ///
    /// `PUT /api/{token}/lights/{id}/state`. Partial failures are logged;
    /// the call only fails if nothing was applied.
    pub async fn set_light_state(
        &self,
        id: &str,
        update: &LightStateUpdate,
    ) -> Result<Map<String, Value>, Error> {
        update.validate()?;

        let endpoint = format!("/lights/{id}/state");
        let body =
            serde_json::to_value(update).map_err(|e| Error::InvalidArgument(e.to_string()))?;
        debug!(id, ?update, "updating light state");

        let replies: Vec<GatewayReply> = self
            .request(Method::PUT, &endpoint, Some(&body), &[])
            .await?;

        flatten_replies(replies, &format!("{endpoint}/"))
    }
}

/// Collapse a reply list into `{attribute: value}`, stripping `prefix`
/// from each success key.
fn flatten_replies(replies: Vec<GatewayReply>, prefix: &str) -> Result<Map<String, Value>, Error> {
    let mut applied = Map::new();
    let mut first_error = None;

    for reply in replies {
        if let Some(Value::Object(success)) = reply.success {
            for (key, value) in success {
                let attr = key.strip_prefix(prefix).unwrap_or(&key).to_string();
                applied.insert(attr, value);
            }
        }
        if let Some(err) = reply.error {
            warn!(kind = err.kind, address = %err.address, "gateway rejected attribute: {}", err.description);
            first_error.get_or_insert(err);
        }
    }

    match first_error {
        Some(err) if applied.is_empty() => Err(Error::Api {
            kind: err.kind,
            description: err.description,
            address: err.address,
            status: 200,
        }),
        _ => Ok(applied),
    }
}

/// Order ids numerically when possible, lexically otherwise.
fn id_order(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}
