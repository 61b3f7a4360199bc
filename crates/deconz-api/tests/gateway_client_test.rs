#![allow(clippy::unwrap_used)]
// Integration tests for `GatewayClient` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use deconz_api::{Error, GatewayClient, LightStateUpdate, ResourceKind, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

const TOKEN: &str = "0A1B2C3D4E";

async fn setup() -> (MockServer, GatewayClient) {
    let server = MockServer::start().await;
    let client = GatewayClient::new(
        Url::parse(&server.uri()).unwrap(),
        Some(SecretString::from(TOKEN.to_string())),
        &TransportConfig::default(),
    )
    .unwrap();
    (server, client)
}

fn api_path(suffix: &str) -> String {
    format!("/api/{TOKEN}{suffix}")
}

// ── Construction ────────────────────────────────────────────────────

#[test]
fn test_from_host_rejects_empty_host() {
    let result = GatewayClient::from_host("", 80, None, &TransportConfig::default());
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
fn test_from_host_builds_base_url() {
    let client = GatewayClient::from_host("10.0.0.5", 8080, None, &TransportConfig::default()).unwrap();
    assert_eq!(client.base_url().as_str(), "http://10.0.0.5:8080/");
    assert!(!client.has_access_token());
}

// ── Requests ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_light_puts_token_in_path() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(api_path("/lights/1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Desk",
            "state": { "on": true, "bri": 120 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let light = client.get_light("1").await.unwrap();
    assert_eq!(light["state"]["bri"], 120);
}

#[tokio::test]
async fn test_get_sends_no_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(api_path("/sensors/4")))
        .and(|req: &Request| req.body.is_empty())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Door" })))
        .expect(1)
        .mount(&server)
        .await;

    let sensor = client.get_sensor("4").await.unwrap();
    assert_eq!(sensor["name"], "Door");
}

#[tokio::test]
async fn test_missing_token_fails_without_request() {
    let server = MockServer::start().await;
    let client = GatewayClient::new(
        Url::parse(&server.uri()).unwrap(),
        None,
        &TransportConfig::default(),
    )
    .unwrap();

    let result = client.get_light("1").await;

    assert!(matches!(result, Err(Error::MissingAccessToken)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(api_path("/lights")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!([
            { "error": { "type": 1, "address": "/lights", "description": "unauthorized user" } }
        ])))
        .mount(&server)
        .await;

    let result = client.list_resources(ResourceKind::Lights).await;
    assert!(matches!(result, Err(Error::Unauthorized)));
}

#[tokio::test]
async fn test_gateway_error_envelope_is_surfaced() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(api_path("/lights/99")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!([
            { "error": { "type": 3, "address": "/lights/99", "description": "resource, /lights/99, not available" } }
        ])))
        .mount(&server)
        .await;

    let err = client.get_light("99").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "[3]: resource, /lights/99, not available : /lights/99"
    );
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_unreachable_host_has_readable_reason() {
    // Port 9 (discard) is closed on any sane test machine.
    let client = GatewayClient::from_host("127.0.0.1", 9, None, &TransportConfig::default())
        .unwrap()
        .with_access_token(SecretString::from("x".to_string()));

    let err = client.get_light("1").await.unwrap_err();
    assert!(
        matches!(err, Error::Unreachable { .. }),
        "expected Unreachable, got: {err:?}"
    );
}

#[tokio::test]
async fn test_timeout_reports_host_without_token() {
    let server = MockServer::start().await;
    let client = GatewayClient::new(
        Url::parse(&server.uri()).unwrap(),
        Some(SecretString::from(TOKEN.to_string())),
        &TransportConfig::with_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path(api_path("/sensors/3")))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = client.get_sensor("3").await.unwrap_err();
    assert!(
        matches!(err, Error::Unreachable { reason: "Request timed out", .. }),
        "expected timeout, got: {err:?}"
    );
    assert!(!err.to_string().contains(TOKEN));
}

// ── Pickers ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_lights_rows_are_sorted_and_formatted() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(api_path("/lights")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "10": { "name": "Hall", "type": "Dimmable light", "modelid": "TRADFRI", "manufacturername": "IKEA" },
            "2": { "name": "Desk", "type": "Color light", "modelid": "LCT015", "manufacturername": "Philips" }
        })))
        .mount(&server)
        .await;

    let rows = client.list_resources(ResourceKind::Lights).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "Desk");
    assert_eq!(rows[0].value, "2:Desk");
    assert_eq!(rows[0].description, "Color light | LCT015 | Philips");
    assert_eq!(rows[1].value, "10:Hall");
}

#[tokio::test]
async fn test_list_groups_uses_bare_ids() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(api_path("/groups")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "1": { "name": "Living room", "lights": ["1", "2"] }
        })))
        .mount(&server)
        .await;

    let rows = client.list_groups().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Living room");
    assert_eq!(rows[0].value, "1");
}

// ── Light state ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_light_state_flattens_reply() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path(api_path("/lights/3/state")))
        .and(body_json(json!({ "on": true, "bri": 180 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "success": { "/lights/3/state/on": true } },
            { "success": { "/lights/3/state/bri": 180 } }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let applied = client
        .set_light_state("3", &LightStateUpdate::new(true).with_brightness(180))
        .await
        .unwrap();

    assert_eq!(applied["on"], true);
    assert_eq!(applied["bri"], 180);
}

#[tokio::test]
async fn test_set_light_state_all_rejected_is_error() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path(api_path("/lights/3/state")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "error": { "type": 201, "address": "/lights/3/state/bri", "description": "parameter, bri, is not modifiable. Device is set to off." } }
        ])))
        .mount(&server)
        .await;

    let err = client
        .set_light_state("3", &LightStateUpdate::new(false).with_brightness(10))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { kind: 201, .. }));
}

#[tokio::test]
async fn test_set_light_state_rejects_out_of_range_brightness() {
    let (server, client) = setup().await;

    let err = client
        .set_light_state("3", &LightStateUpdate::new(true).with_brightness(255))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
