// ── Gateway ──
//
// Entry point for consumers. Owns the REST client and the session
// registry, and exposes pairing, resource pickers, device commands and
// event triggers.

use std::sync::Arc;

use deconz_api::{
    EventPredicate, GatewayClient, ResourceKind, ResourceOption, RetryingKeyFetcher,
    SessionRegistry,
};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::GatewayConfig;
use crate::device::DeviceCommand;
use crate::emit::Emitter;
use crate::error::CoreError;
use crate::trigger::{self, TriggerHandle};

/// Device type the gateway records for keys issued to this application.
pub const DEVICE_TYPE: &str = "deconz-rs";

/// Handle to one gateway.
///
/// Cheaply cloneable; clones share the client and the registry.
#[derive(Debug, Clone)]
pub struct Gateway {
    config: GatewayConfig,
    client: GatewayClient,
    registry: Arc<SessionRegistry>,
}

impl Gateway {
    /// Gateway whose triggers stream over real websockets.
    pub fn new(config: GatewayConfig) -> Result<Self, CoreError> {
        Self::with_registry(config, Arc::new(SessionRegistry::with_websocket()))
    }

    /// Gateway sharing an existing registry (and so its stream sessions).
    pub fn with_registry(
        config: GatewayConfig,
        registry: Arc<SessionRegistry>,
    ) -> Result<Self, CoreError> {
        let client = config.rest_client()?;
        Ok(Self {
            config,
            client,
            registry,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn client(&self) -> &GatewayClient {
        &self.client
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    // ── Provisioning ─────────────────────────────────────────────────

    /// Acquire an access key, retrying while the link button is not
    /// pressed. The returned key is not stored anywhere.
    pub async fn pair(
        &self,
        retries: u32,
        cancel: CancellationToken,
    ) -> Result<SecretString, CoreError> {
        info!(host = %self.config.host, retries, "Requesting access key");
        let key = RetryingKeyFetcher::new(&self.client, DEVICE_TYPE)
            .with_retry_delay(self.config.pair_retry_delay)
            .with_cancellation(cancel)
            .fetch_with_retry(retries)
            .await?;
        Ok(key)
    }

    // ── Resources ────────────────────────────────────────────────────

    /// Picker rows for lights or sensors.
    pub async fn resource_options(
        &self,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceOption>, CoreError> {
        match kind {
            ResourceKind::Lights | ResourceKind::Sensors => {
                Ok(self.client.list_resources(kind).await?)
            }
            ResourceKind::Groups => self.group_options().await,
            other => Err(CoreError::ValidationFailed {
                message: format!("{other} cannot be listed as resources"),
            }),
        }
    }

    pub async fn group_options(&self) -> Result<Vec<ResourceOption>, CoreError> {
        Ok(self.client.list_groups().await?)
    }

    pub async fn execute(&self, command: &DeviceCommand) -> Result<serde_json::Value, CoreError> {
        command.execute(&self.client).await
    }

    pub async fn execute_and_emit(
        &self,
        command: &DeviceCommand,
        emitter: &dyn Emitter,
    ) -> Result<(), CoreError> {
        command.execute_and_emit(&self.client, emitter).await
    }

    // ── Event stream ─────────────────────────────────────────────────

    /// Start a trigger forwarding every event matching `predicate`.
    pub fn watch(
        &self,
        predicate: EventPredicate,
        emitter: Arc<dyn Emitter>,
    ) -> Result<TriggerHandle, CoreError> {
        trigger::start(&self.registry, &self.config.stream_url(), predicate, emitter)
    }

    /// Force-close every stream session opened through this gateway's
    /// registry.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }
}
