// ── Filtered subscriptions on a shared session ──
//
// A subscriber registers two tagged listeners on a session: one on
// `message` that filters gateway events, and one on `dispose` that tears
// down only that subscriber's registrations when a detach request carrying
// its correlation id is published.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::event::{ChangeKind, GatewayEvent};
use super::session::{Session, SessionEvent, SessionEventKind};
use crate::error::Error;
use crate::resources::ResourceKind;

/// Identifies one subscriber's registrations on a shared session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CorrelationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Which gateway events a subscriber wants.
///
/// Kinds are compared by their wire names, so a predicate only ever
/// matches the exact `e`/`r` strings it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPredicate {
    pub change: String,
    pub resource: String,
    pub resource_id: String,
}

impl EventPredicate {
    pub fn new(change: ChangeKind, resource: ResourceKind, resource_id: impl Into<String>) -> Self {
        Self::from_wire(change.to_string(), resource.to_string(), resource_id)
    }

    /// Match on raw `e`/`r` values, including kinds without an enum variant.
    pub fn from_wire(
        change: impl Into<String>,
        resource: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            change: change.into(),
            resource: resource.into(),
            resource_id: resource_id.into(),
        }
    }

    /// An event matches when it is an `event` message and type, resource
    /// and id all equal the predicate's.
    pub fn matches(&self, event: &GatewayEvent) -> bool {
        event.is_event()
            && event.change_name() == self.change
            && event.resource_name() == self.resource
            && event.id.as_deref() == Some(self.resource_id.as_str())
    }
}

/// One subscriber's registrations on a session.
///
/// Dropping a `Subscription` does not detach it; call
/// [`detach`](Self::detach) or publish a dispose request with
/// [`request_detach`].
#[derive(Debug)]
pub struct Subscription {
    session: Session,
    correlation_id: CorrelationId,
    first_match: Option<oneshot::Receiver<GatewayEvent>>,
}

/// Register a filtered subscriber on `session`.
///
/// `on_match` runs for every matching event. The subscriber does not open
/// the connection; call [`Session::connect`] if it is not connected yet.
pub fn subscribe<F>(
    session: &Session,
    predicate: EventPredicate,
    correlation_id: CorrelationId,
    on_match: F,
) -> Result<Subscription, Error>
where
    F: Fn(&GatewayEvent) + Send + Sync + 'static,
{
    if session.has_tag(&correlation_id) {
        return Err(Error::InvalidArgument(format!(
            "correlation id '{correlation_id}' is already subscribed on {}",
            session.url()
        )));
    }

    let (first_tx, first_rx) = oneshot::channel();
    let first_tx = Mutex::new(Some(first_tx));

    session.on_tagged(
        SessionEventKind::Message,
        correlation_id.clone(),
        move |event| {
            let SessionEvent::Message(payload) = event else {
                return;
            };
            let Some(parsed) = GatewayEvent::parse(payload) else {
                return;
            };
            if !predicate.matches(&parsed) {
                trace!(change = parsed.change_name(), resource = parsed.resource_name(), "event filtered out");
                return;
            }

            on_match(&parsed);
            if let Some(tx) = first_tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
                let _ = tx.send(parsed);
            }
        },
    );

    let weak = session.downgrade();
    let own_id = correlation_id.clone();
    session.on_tagged(
        SessionEventKind::Dispose,
        correlation_id.clone(),
        move |event| {
            let SessionEvent::Dispose(target) = event else {
                return;
            };
            if *target != own_id {
                return;
            }
            let Some(session) = weak.upgrade() else {
                return;
            };
            let removed = session.off_tagged(&own_id);
            debug!(correlation_id = %own_id, removed, "subscriber detached");
            session.close(false);
        },
    );

    debug!(correlation_id = %correlation_id, url = %session.url(), "subscriber attached");
    Ok(Subscription {
        session: session.clone(),
        correlation_id,
        first_match: Some(first_rx),
    })
}

/// Publish a detach request for `correlation_id`. Only that subscriber's
/// registrations are removed; the connection closes if no other message
/// listener remains.
pub fn request_detach(session: &Session, correlation_id: &CorrelationId) {
    session.emit(&SessionEvent::Dispose(correlation_id.clone()));
}

impl Subscription {
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// `true` while this subscriber's registrations are still in place.
    pub fn is_active(&self) -> bool {
        self.session.has_tag(&self.correlation_id)
    }

    /// Wait for the first matching event.
    ///
    /// Returns `None` once the subscriber is detached without having seen a
    /// match, or if the first match was already taken.
    pub async fn first_match(&mut self) -> Option<GatewayEvent> {
        let rx = self.first_match.take()?;
        rx.await.ok()
    }

    /// Detach through the session's dispose broadcast.
    pub fn detach(self) {
        request_detach(&self.session, &self.correlation_id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use url::Url;

    use super::*;
    use crate::stream::mock::{MockTransport, settle};
    use crate::stream::session::ReconnectConfig;
    use crate::stream::transport::Transport;

    fn session(transport: &Arc<MockTransport>) -> Session {
        Session::new(
            Url::parse("ws://gateway.local:8088").unwrap(),
            Arc::clone(transport) as Arc<dyn Transport>,
            ReconnectConfig::default(),
        )
    }

    fn light_changed(id: &str) -> EventPredicate {
        EventPredicate::new(ChangeKind::Changed, ResourceKind::Lights, id)
    }

    fn counting(count: &Arc<AtomicUsize>) -> impl Fn(&GatewayEvent) + Send + Sync + 'static {
        let count = Arc::clone(count);
        move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn predicate_requires_every_field() {
        let predicate = light_changed("1");
        let event = |raw: &str| GatewayEvent::parse(raw).unwrap();

        assert!(predicate.matches(&event(r#"{"t":"event","e":"changed","r":"lights","id":"1"}"#)));
        assert!(!predicate.matches(&event(r#"{"t":"event","e":"changed","r":"lights","id":"2"}"#)));
        assert!(!predicate.matches(&event(r#"{"t":"event","e":"added","r":"lights","id":"1"}"#)));
        assert!(!predicate.matches(&event(r#"{"t":"event","e":"changed","r":"sensors","id":"1"}"#)));
        assert!(!predicate.matches(&event(r#"{"t":"other","e":"changed","r":"lights","id":"1"}"#)));
    }

    #[test]
    fn unknown_kinds_match_only_their_own_wire_name() {
        let event = |raw: &str| GatewayEvent::parse(raw).unwrap();
        let renamed = EventPredicate::from_wire("renamed", "alarmsystems", "1");
        let catch_all = EventPredicate::new(ChangeKind::Other, ResourceKind::Other, "1");

        let wire = event(r#"{"t":"event","e":"renamed","r":"alarmsystems","id":"1"}"#);
        let other = event(r#"{"t":"event","e":"armed","r":"alarmsystems","id":"1"}"#);

        assert!(renamed.matches(&wire));
        assert!(!renamed.matches(&other));
        assert!(!catch_all.matches(&wire));
        assert!(!catch_all.matches(&other));
    }

    #[tokio::test(start_paused = true)]
    async fn matching_events_reach_the_callback() {
        let transport = MockTransport::new();
        let session = session(&transport);
        let hits = Arc::new(AtomicUsize::new(0));

        let mut sub = subscribe(&session, light_changed("1"), "a".into(), counting(&hits)).unwrap();
        session.connect().unwrap();
        let conn = transport.latest().unwrap();
        conn.open();
        conn.message(r#"{"t":"event","e":"changed","r":"lights","id":"2"}"#);
        conn.message("garbage");
        conn.message(r#"{"t":"event","e":"changed","r":"lights","id":"1","state":{"on":true}}"#);
        settle().await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let first = sub.first_match().await.unwrap();
        assert_eq!(first.extra["state"]["on"], true);
        assert!(sub.first_match().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_only_affects_its_own_subscriber() {
        let transport = MockTransport::new();
        let session = session(&transport);
        let a_hits = Arc::new(AtomicUsize::new(0));
        let b_hits = Arc::new(AtomicUsize::new(0));

        let a = subscribe(&session, light_changed("1"), "A".into(), counting(&a_hits)).unwrap();
        let b = subscribe(&session, light_changed("1"), "B".into(), counting(&b_hits)).unwrap();
        session.connect().unwrap();
        let conn = transport.latest().unwrap();
        conn.open();
        settle().await;

        request_detach(&session, a.correlation_id());
        assert!(!a.is_active());
        assert!(b.is_active());
        assert!(session.is_connected(), "B still listens for messages");

        conn.message(r#"{"t":"event","e":"changed","r":"lights","id":"1"}"#);
        settle().await;
        assert_eq!(a_hits.load(Ordering::SeqCst), 0);
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn last_detach_closes_the_connection() {
        let transport = MockTransport::new();
        let session = session(&transport);

        let sub = subscribe(&session, light_changed("1"), "only".into(), |_| {}).unwrap();
        session.connect().unwrap();
        transport.latest().unwrap().open();
        settle().await;

        sub.detach();

        assert!(!session.is_connected());
        assert_eq!(session.listener_count(SessionEventKind::Message), 0);
        assert_eq!(session.listener_count(SessionEventKind::Dispose), 0);
        assert!(transport.latest().unwrap().is_released());
    }

    #[test]
    fn duplicate_correlation_id_is_rejected() {
        let transport = MockTransport::new();
        let session = session(&transport);

        subscribe(&session, light_changed("1"), "dup".into(), |_| {}).unwrap();
        let err = subscribe(&session, light_changed("2"), "dup".into(), |_| {}).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn first_match_resolves_none_after_detach() {
        let transport = MockTransport::new();
        let session = session(&transport);

        let mut sub = subscribe(&session, light_changed("1"), "x".into(), |_| {}).unwrap();
        request_detach(&session, sub.correlation_id());

        assert!(sub.first_match().await.is_none());
    }

    #[test]
    fn random_ids_are_unique() {
        assert_ne!(CorrelationId::random(), CorrelationId::random());
    }
}
