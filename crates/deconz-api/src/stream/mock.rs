// In-memory transport for driving sessions from tests.
//
// Every `open` hands out a `MockConnection` that the test uses to play the
// server's part: open the connection, push frames, or drop it.

use std::sync::{Arc, Mutex, PoisonError};

use url::Url;

use super::transport::{Transport, TransportHandle, TransportSink, channel};
use crate::error::Error;

/// Records every connection attempt and lets tests script each one.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    connections: Vec<MockConnection>,
    fail_creation: bool,
}

/// Server side of one mock connection.
#[derive(Clone)]
pub struct MockConnection {
    pub url: Url,
    sink: TransportSink,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent `open` calls fail before a transport exists.
    pub fn fail_creation(&self, fail: bool) {
        self.lock().fail_creation = fail;
    }

    /// Number of transports successfully created so far.
    pub fn open_count(&self) -> usize {
        self.lock().connections.len()
    }

    pub fn connection(&self, index: usize) -> Option<MockConnection> {
        self.lock().connections.get(index).cloned()
    }

    pub fn latest(&self) -> Option<MockConnection> {
        self.lock().connections.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &Url) -> Result<TransportHandle, Error> {
        let mut state = self.lock();
        if state.fail_creation {
            return Err(Error::WebSocketConnect("mock transport refused".into()));
        }
        let (sink, handle) = channel();
        state.connections.push(MockConnection {
            url: url.clone(),
            sink,
        });
        Ok(handle)
    }
}

impl MockConnection {
    pub fn open(&self) {
        self.sink.opened();
    }

    pub fn message(&self, text: impl Into<String>) {
        self.sink.message(text);
    }

    pub fn error(&self, err: impl Into<String>) {
        self.sink.error(err);
    }

    pub fn unexpected_response(&self, status: u16) {
        self.sink.unexpected_response(status);
    }

    pub fn close(&self, code: u16, reason: impl Into<String>) {
        self.sink.closed(code, reason);
    }

    /// `true` once the owning session has let go of this connection.
    pub fn is_released(&self) -> bool {
        self.sink.is_released()
    }
}

/// Let spawned session tasks run until they are idle.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
