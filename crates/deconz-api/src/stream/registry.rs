// ── Session registry ──
//
// Process-wide map from normalized endpoint URL to its single shared
// session. Owned by whoever needs it (usually the core `Gateway`) and
// passed around as an `Arc`.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};
use url::Url;

use super::session::{ReconnectConfig, Session};
use super::transport::{Transport, WsTransport};
use crate::error::Error;

/// At most one [`Session`] per endpoint URL.
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
    transport: Arc<dyn Transport>,
    reconnect: ReconnectConfig,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("reconnect", &self.reconnect)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            sessions: DashMap::new(),
            transport,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Registry whose sessions connect over real websockets.
    pub fn with_websocket() -> Self {
        Self::new(Arc::new(WsTransport))
    }

    /// Override the reconnect policy for sessions created from now on.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Return the session for `url`, creating an idle one on first use.
    ///
    /// URLs are compared after parsing, so `ws://Host:8088` and
    /// `ws://host:8088/` share a session.
    pub fn get_or_create(&self, url: &str) -> Result<Session, Error> {
        let url = parse_endpoint(url)?;
        let session = self
            .sessions
            .entry(url.as_str().to_owned())
            .or_insert_with(|| {
                info!(url = %url, "Creating event stream session");
                Session::new(url.clone(), Arc::clone(&self.transport), self.reconnect.clone())
            })
            .clone();
        Ok(session)
    }

    /// The session for `url`, if one exists.
    pub fn get(&self, url: &str) -> Option<Session> {
        let url = parse_endpoint(url).ok()?;
        self.sessions.get(url.as_str()).map(|entry| entry.clone())
    }

    /// Remove `session` from the map if it is still the registered instance.
    pub fn remove(&self, session: &Session) -> Option<Session> {
        self.sessions
            .remove_if(session.url().as_str(), |_, current| current.ptr_eq(session))
            .map(|(_, removed)| {
                debug!(url = %removed.url(), "session removed from registry");
                removed
            })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Force-close and forget every session.
    pub fn shutdown(&self) {
        let sessions: Vec<Session> = self.sessions.iter().map(|entry| entry.value().clone()).collect();
        self.sessions.clear();
        for session in &sessions {
            session.close(true);
        }
        info!(count = sessions.len(), "Event stream sessions shut down");
    }
}

fn parse_endpoint(url: &str) -> Result<Url, Error> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("event stream URL is empty".into()));
    }
    Ok(Url::parse(trimmed)?)
}
