//! Shared, reconnecting event-stream session.
//!
//! A [`Session`] owns at most one live transport for one endpoint URL and
//! re-publishes everything the transport reports to its registered
//! listeners. Unexpected closes trigger a reconnect after a fixed interval,
//! up to [`ReconnectConfig::max_retries`] consecutive attempts; after that
//! the session closes itself and publishes [`SessionEvent::MaxRetries`].
//!
//! Listener callbacks run outside of the session's locks, so a callback may
//! register or remove listeners, or close the session, while it runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use strum::Display;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::subscription::CorrelationId;
use super::transport::{ABNORMAL_CLOSURE, ReadyState, Transport, TransportSignal};
use crate::error::Error;

/// Consecutive connect attempts before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Fixed delay before each reconnect attempt.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(5000);

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Reconnect policy: a fixed interval and a bounded attempt count.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before each reconnect attempt. Default: 5s.
    pub retry_interval: Duration,

    /// Connect attempts allowed without a successful open. Default: 10.
    pub max_retries: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

// ── Events ───────────────────────────────────────────────────────────

/// Everything a session publishes to its listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Open,
    Message(Arc<str>),
    Error(String),
    UnexpectedResponse { status: u16 },
    /// Terminal close; only published when no reconnect will follow.
    Close { code: u16, reason: String },
    /// Detach request addressed to the subscriber with this id.
    Dispose(CorrelationId),
    /// Reconnect budget exhausted; the session has closed itself.
    MaxRetries(String),
}

impl SessionEvent {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            Self::Open => SessionEventKind::Open,
            Self::Message(_) => SessionEventKind::Message,
            Self::Error(_) => SessionEventKind::Error,
            Self::UnexpectedResponse { .. } => SessionEventKind::UnexpectedResponse,
            Self::Close { .. } => SessionEventKind::Close,
            Self::Dispose(_) => SessionEventKind::Dispose,
            Self::MaxRetries(_) => SessionEventKind::MaxRetries,
        }
    }
}

/// Listener key for [`SessionEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionEventKind {
    Open,
    Message,
    Error,
    UnexpectedResponse,
    Close,
    Dispose,
    MaxRetries,
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

/// Handle returned by [`Session::on`]; pass it to [`Session::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

struct Listener {
    id: ListenerId,
    tag: Option<CorrelationId>,
    callback: Callback,
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    by_kind: HashMap<SessionEventKind, Vec<Listener>>,
}

// ── Session ──────────────────────────────────────────────────────────

/// One shared connection to one event-stream endpoint.
///
/// Cheaply cloneable; clones refer to the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

/// Non-owning reference held by listeners that need to call back into
/// their session.
#[derive(Clone)]
pub(crate) struct WeakSession(Weak<SessionInner>);

impl WeakSession {
    pub(crate) fn upgrade(&self) -> Option<Session> {
        self.0.upgrade().map(|inner| Session { inner })
    }
}

struct SessionInner {
    url: Url,
    transport: Arc<dyn Transport>,
    reconnect: ReconnectConfig,
    core: Mutex<SessionCore>,
    listeners: Mutex<ListenerTable>,
}

struct SessionCore {
    state: SessionState,
    active: Option<ActiveTransport>,
    should_reconnect: bool,
    retry_count: u32,
    /// Bumped whenever the active transport changes; signals carrying an
    /// older generation are discarded.
    generation: u64,
    pending_reconnect: Option<CancellationToken>,
}

struct ActiveTransport {
    ready: watch::Receiver<ReadyState>,
    release: CancellationToken,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core();
        f.debug_struct("Session")
            .field("url", &self.inner.url.as_str())
            .field("state", &core.state)
            .field("retry_count", &core.retry_count)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create an idle session. Nothing connects until [`connect`](Self::connect).
    pub fn new(url: Url, transport: Arc<dyn Transport>, reconnect: ReconnectConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                url,
                transport,
                reconnect,
                core: Mutex::new(SessionCore {
                    state: SessionState::Idle,
                    active: None,
                    should_reconnect: false,
                    retry_count: 0,
                    generation: 0,
                    pending_reconnect: None,
                }),
                listeners: Mutex::new(ListenerTable::default()),
            }),
        }
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn state(&self) -> SessionState {
        self.core().state
    }

    pub fn retry_count(&self) -> u32 {
        self.core().retry_count
    }

    pub fn should_reconnect(&self) -> bool {
        self.core().should_reconnect
    }

    /// `true` iff a transport exists and reports itself open.
    pub fn is_connected(&self) -> bool {
        self.core()
            .active
            .as_ref()
            .is_some_and(|active| *active.ready.borrow() == ReadyState::Open)
    }

    /// `true` if both handles refer to the same session.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakSession {
        WeakSession(Arc::downgrade(&self.inner))
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Start a connection if no live transport exists.
    ///
    /// Returns once the transport is created; the open itself is reported
    /// later as [`SessionEvent::Open`]. If the transport cannot be created,
    /// the failure is handled like a close (which may schedule a reconnect)
    /// and then returned.
    pub fn connect(&self) -> Result<(), Error> {
        let mut core = self.core();

        if core
            .active
            .as_ref()
            .is_some_and(|active| *active.ready.borrow() != ReadyState::Closed)
        {
            trace!(url = %self.inner.url, "transport already present");
            return Ok(());
        }

        if let Some(pending) = core.pending_reconnect.take() {
            pending.cancel();
        }
        release_transport(&mut core);

        core.retry_count += 1;
        core.state = SessionState::Connecting;
        info!(url = %self.inner.url, attempt = core.retry_count, "Connecting event stream");

        let opened = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::WebSocketConnect(e.to_string()))
            .and_then(|runtime| {
                self.inner
                    .transport
                    .open(&self.inner.url)
                    .map(|handle| (runtime, handle))
            });

        match opened {
            Ok((runtime, handle)) => {
                let (signals, ready, release) = handle.into_parts();
                core.should_reconnect = true;
                core.generation += 1;
                let generation = core.generation;
                core.active = Some(ActiveTransport {
                    ready,
                    release: release.clone(),
                });
                drop(core);

                runtime.spawn(pump_signals(self.downgrade(), generation, signals, release));
                Ok(())
            }
            Err(e) => {
                drop(core);
                warn!(url = %self.inner.url, error = %e, "Failed to create event stream transport");
                self.handle_close(ABNORMAL_CLOSURE, e.to_string());
                Err(e)
            }
        }
    }

    /// Close the connection unless `message` listeners still depend on it.
    ///
    /// With `force`, always closes. Only `message` listeners hold the
    /// connection open; `dispose`, `error` and other listeners do not.
    /// Returns whether the close took effect.
    pub fn close(&self, force: bool) -> bool {
        let message_listeners = self.listener_count(SessionEventKind::Message);
        if !force && message_listeners > 0 {
            debug!(url = %self.inner.url, message_listeners, "listeners are still present, keeping connection");
            return false;
        }

        let mut core = self.core();
        release_transport(&mut core);
        if let Some(pending) = core.pending_reconnect.take() {
            pending.cancel();
        }
        core.retry_count = 0;
        core.should_reconnect = false;
        core.state = SessionState::Closed;
        drop(core);

        info!(url = %self.inner.url, force, "Event stream closed");
        true
    }

    /// Reaction to an unexpected close: schedule another attempt while the
    /// budget lasts, otherwise give up.
    fn reconnect(&self) {
        let scheduled = {
            let mut core = self.core();
            if core.should_reconnect && core.retry_count < self.inner.reconnect.max_retries {
                release_transport(&mut core);
                core.state = SessionState::Reconnecting;
                let token = CancellationToken::new();
                if let Some(previous) = core.pending_reconnect.replace(token.clone()) {
                    previous.cancel();
                }
                Some((token, core.retry_count))
            } else {
                None
            }
        };

        let Some((token, retry_count)) = scheduled else {
            warn!(
                url = %self.inner.url,
                max_retries = self.inner.reconnect.max_retries,
                "Event stream reconnection limit reached, giving up"
            );
            self.close(true);
            self.emit(&SessionEvent::MaxRetries(
                "Maximum connection attempts exceeded".into(),
            ));
            return;
        };

        let delay = self.inner.reconnect.retry_interval;
        info!(
            url = %self.inner.url,
            attempt = retry_count + 1,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Waiting before reconnect"
        );

        let session = self.downgrade();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    trace!("scheduled reconnect cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    if let Some(session) = session.upgrade() {
                        if let Err(e) = session.connect() {
                            debug!(error = %e, "scheduled reconnect failed");
                        }
                    }
                }
            }
        });
    }

    // ── Signal handling ──────────────────────────────────────────────

    fn dispatch(&self, generation: u64, signal: TransportSignal) {
        {
            let mut core = self.core();
            if core.generation != generation || core.active.is_none() {
                trace!(?signal, "dropping signal from released transport");
                return;
            }
            if signal == TransportSignal::Open {
                core.retry_count = 0;
                core.state = SessionState::Open;
            }
        }

        match signal {
            TransportSignal::Open => {
                info!(url = %self.inner.url, "Event stream open");
                self.emit(&SessionEvent::Open);
            }
            TransportSignal::Message(text) => {
                self.emit(&SessionEvent::Message(Arc::from(text)));
            }
            TransportSignal::Error(err) => {
                warn!(url = %self.inner.url, error = %err, "Event stream error");
                self.emit(&SessionEvent::Error(err));
            }
            TransportSignal::UnexpectedResponse { status } => {
                warn!(url = %self.inner.url, status, "Unexpected response to upgrade request");
                self.emit(&SessionEvent::UnexpectedResponse { status });
            }
            TransportSignal::Close { code, reason } => self.handle_close(code, reason),
        }
    }

    fn handle_close(&self, code: u16, reason: String) {
        let should_reconnect = self.core().should_reconnect;
        if should_reconnect {
            debug!(url = %self.inner.url, code, reason = %reason, "Event stream dropped");
            self.reconnect();
            return;
        }

        {
            let mut core = self.core();
            release_transport(&mut core);
            core.state = SessionState::Closed;
        }
        info!(url = %self.inner.url, code, reason = %reason, "Event stream closed by peer");
        self.emit(&SessionEvent::Close { code, reason });
    }

    // ── Publish table ────────────────────────────────────────────────

    /// Register `callback` for events of `kind`. Listeners of one kind run
    /// in registration order.
    pub fn on<F>(&self, kind: SessionEventKind, callback: F) -> ListenerId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.register(kind, None, Arc::new(callback))
    }

    /// Like [`on`](Self::on), tagging the registration with a correlation id
    /// so [`off_tagged`](Self::off_tagged) can remove it.
    pub fn on_tagged<F>(&self, kind: SessionEventKind, tag: CorrelationId, callback: F) -> ListenerId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.register(kind, Some(tag), Arc::new(callback))
    }

    fn register(
        &self,
        kind: SessionEventKind,
        tag: Option<CorrelationId>,
        callback: Callback,
    ) -> ListenerId {
        let mut table = self.listeners();
        table.next_id += 1;
        let id = ListenerId(table.next_id);
        table.by_kind.entry(kind).or_default().push(Listener { id, tag, callback });
        id
    }

    /// Remove one registration. Returns `false` if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut table = self.listeners();
        for listeners in table.by_kind.values_mut() {
            if let Some(pos) = listeners.iter().position(|l| l.id == id) {
                listeners.remove(pos);
                return true;
            }
        }
        false
    }

    /// Remove every registration tagged with `tag`, returning how many.
    pub fn off_tagged(&self, tag: &CorrelationId) -> usize {
        let mut table = self.listeners();
        let mut removed = 0;
        for listeners in table.by_kind.values_mut() {
            let before = listeners.len();
            listeners.retain(|l| l.tag.as_ref() != Some(tag));
            removed += before - listeners.len();
        }
        removed
    }

    pub fn listener_count(&self, kind: SessionEventKind) -> usize {
        self.listeners().by_kind.get(&kind).map_or(0, Vec::len)
    }

    /// `true` if any registration carries `tag`.
    pub fn has_tag(&self, tag: &CorrelationId) -> bool {
        self.listeners()
            .by_kind
            .values()
            .flatten()
            .any(|l| l.tag.as_ref() == Some(tag))
    }

    /// Publish `event` to every listener of its kind.
    pub fn emit(&self, event: &SessionEvent) {
        let callbacks: Vec<Callback> = self
            .listeners()
            .by_kind
            .get(&event.kind())
            .map(|listeners| listeners.iter().map(|l| Arc::clone(&l.callback)).collect())
            .unwrap_or_default();

        trace!(kind = %event.kind(), listeners = callbacks.len(), "publishing session event");
        for callback in callbacks {
            callback(event);
        }
    }

    // ── Locking ──────────────────────────────────────────────────────

    fn core(&self) -> MutexGuard<'_, SessionCore> {
        self.inner.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, ListenerTable> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// The last handle going away must not leave a socket or a scheduled
// reconnect running behind it.
impl Drop for SessionInner {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = core.pending_reconnect.take() {
            pending.cancel();
        }
        if core.active.is_some() {
            debug!(url = %self.url, "Session dropped, releasing event stream transport");
        }
        release_transport(core);
    }
}

/// Drop the active transport and stop delivery of its signals. Subscriber
/// listeners are untouched.
fn release_transport(core: &mut SessionCore) {
    if let Some(active) = core.active.take() {
        active.release.cancel();
    }
    core.generation += 1;
}

/// Forward one transport's signals into its session, in order, until the
/// transport is released or the session is gone.
async fn pump_signals(
    session: WeakSession,
    generation: u64,
    mut signals: mpsc::UnboundedReceiver<TransportSignal>,
    release: CancellationToken,
) {
    loop {
        let signal = tokio::select! {
            biased;
            () = release.cancelled() => break,
            signal = signals.recv() => match signal {
                Some(signal) => signal,
                None => break,
            },
        };

        let Some(session) = session.upgrade() else {
            break;
        };
        session.dispatch(generation, signal);
    }
    trace!(generation, "signal pump exiting");
}
