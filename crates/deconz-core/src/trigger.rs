// ── Event trigger ──
//
// Attaches one logical subscriber to the gateway's shared event stream and
// forwards every matching event to an emitter. Many triggers may watch the
// same gateway; they share one connection through the session registry.

use std::sync::Arc;

use deconz_api::{
    CorrelationId, EventPredicate, GatewayEvent, Session, SessionRegistry, Subscription, subscribe,
};
use tracing::{info, warn};

use crate::emit::Emitter;
use crate::error::CoreError;

/// A live trigger. Closing it detaches only this subscriber.
#[derive(Debug)]
pub struct TriggerHandle {
    subscription: Subscription,
}

impl TriggerHandle {
    pub fn correlation_id(&self) -> &CorrelationId {
        self.subscription.correlation_id()
    }

    pub fn session(&self) -> &Session {
        self.subscription.session()
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Wait for the first event this trigger forwards.
    pub async fn first_event(&mut self) -> Option<GatewayEvent> {
        self.subscription.first_match().await
    }

    /// Detach this trigger. The connection closes once no other trigger
    /// listens on it.
    pub fn close(self) {
        info!(correlation_id = %self.subscription.correlation_id(), "Closing trigger");
        self.subscription.detach();
    }
}

/// Subscribe to `stream_url` through `registry` and forward matches to
/// `emitter` as the raw event JSON.
pub fn start(
    registry: &SessionRegistry,
    stream_url: &str,
    predicate: EventPredicate,
    emitter: Arc<dyn Emitter>,
) -> Result<TriggerHandle, CoreError> {
    let session = registry.get_or_create(stream_url)?;
    let correlation_id = CorrelationId::random();

    info!(
        url = %session.url(),
        correlation_id = %correlation_id,
        change = %predicate.change,
        resource = %predicate.resource,
        resource_id = %predicate.resource_id,
        "Starting trigger"
    );

    let subscription = subscribe(&session, predicate, correlation_id, move |event| {
        emitter.emit(event.to_json());
    })?;

    if !session.is_connected() {
        if let Err(e) = session.connect() {
            warn!(url = %session.url(), error = %e, "Event stream could not be started");
            subscription.detach();
            return Err(e.into());
        }
    }

    Ok(TriggerHandle { subscription })
}
