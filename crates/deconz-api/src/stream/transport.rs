// ── Event stream transport ──
//
// A transport is one duplex connection attempt. It reports what happens
// to it as a sequence of `TransportSignal`s and exposes its ready state;
// the owning `Session` releases it through a cancellation token.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info, trace};
use url::Url;

use crate::error::Error;

/// Close code used when the connection drops without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// What a transport reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    Open,
    Message(String),
    Error(String),
    /// The server answered the upgrade request with a non-101 status.
    UnexpectedResponse { status: u16 },
    Close { code: u16, reason: String },
}

/// Connection readiness, mirroring the websocket `readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closed,
}

/// Creates transports. Implementations must not block: `open` starts the
/// connection in the background and returns immediately.
pub trait Transport: Send + Sync + 'static {
    /// Start a connection to `url`. An `Err` means the transport could not
    /// even be created; runtime failures arrive as signals instead.
    fn open(&self, url: &Url) -> Result<TransportHandle, Error>;
}

/// Owner's side of a transport.
pub struct TransportHandle {
    signals: mpsc::UnboundedReceiver<TransportSignal>,
    ready: watch::Receiver<ReadyState>,
    release: CancellationToken,
}

impl TransportHandle {
    pub(crate) fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedReceiver<TransportSignal>,
        watch::Receiver<ReadyState>,
        CancellationToken,
    ) {
        (self.signals, self.ready, self.release)
    }
}

/// Transport's side: reports signals and learns when it has been released.
#[derive(Clone)]
pub struct TransportSink {
    signals: mpsc::UnboundedSender<TransportSignal>,
    ready: watch::Sender<ReadyState>,
    release: CancellationToken,
}

/// Create a connected sink/handle pair in the `Connecting` state.
pub fn channel() -> (TransportSink, TransportHandle) {
    let (signals_tx, signals_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = watch::channel(ReadyState::Connecting);
    let release = CancellationToken::new();

    let sink = TransportSink {
        signals: signals_tx,
        ready: ready_tx,
        release: release.clone(),
    };
    let handle = TransportHandle {
        signals: signals_rx,
        ready: ready_rx,
        release,
    };
    (sink, handle)
}

impl TransportSink {
    pub fn opened(&self) {
        self.ready.send_replace(ReadyState::Open);
        self.signal(TransportSignal::Open);
    }

    pub fn message(&self, text: impl Into<String>) {
        self.signal(TransportSignal::Message(text.into()));
    }

    pub fn error(&self, err: impl Into<String>) {
        self.signal(TransportSignal::Error(err.into()));
    }

    pub fn unexpected_response(&self, status: u16) {
        self.signal(TransportSignal::UnexpectedResponse { status });
    }

    pub fn closed(&self, code: u16, reason: impl Into<String>) {
        self.ready.send_replace(ReadyState::Closed);
        self.signal(TransportSignal::Close {
            code,
            reason: reason.into(),
        });
    }

    /// Mark the connection closed without reporting it (owner already left).
    pub fn mark_closed(&self) {
        self.ready.send_replace(ReadyState::Closed);
    }

    pub fn is_released(&self) -> bool {
        self.release.is_cancelled()
    }

    pub fn released(&self) -> WaitForCancellationFuture<'_> {
        self.release.cancelled()
    }

    fn signal(&self, signal: TransportSignal) {
        // The owner may already have dropped its receiver.
        let _ = self.signals.send(signal);
    }
}

// ── WebSocket transport ──────────────────────────────────────────────

/// Production transport backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl Transport for WsTransport {
    fn open(&self, url: &Url) -> Result<TransportHandle, Error> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::WebSocketConnect(format!(
                    "unsupported scheme '{other}'"
                )));
            }
        }

        let uri: tungstenite::http::Uri = url.as_str().parse().map_err(
            |e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()),
        )?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        let (sink, handle) = channel();
        runtime.spawn(run_socket(uri, sink));
        Ok(handle)
    }
}

/// Drive one websocket connection until it closes or is released.
async fn run_socket(uri: tungstenite::http::Uri, sink: TransportSink) {
    info!(uri = %uri, "Connecting to WebSocket");

    let connect = tokio_tungstenite::connect_async(ClientRequestBuilder::new(uri));
    let ws_stream = tokio::select! {
        biased;
        () = sink.released() => {
            sink.mark_closed();
            return;
        }
        result = connect => match result {
            Ok((stream, _response)) => stream,
            Err(tungstenite::Error::Http(response)) => {
                let status = response.status().as_u16();
                sink.unexpected_response(status);
                sink.closed(ABNORMAL_CLOSURE, format!("unexpected HTTP {status}"));
                return;
            }
            Err(e) => {
                sink.error(e.to_string());
                sink.closed(ABNORMAL_CLOSURE, e.to_string());
                return;
            }
        }
    };

    info!("WebSocket connected");
    sink.opened();

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = sink.released() => {
                let _ = write.send(tungstenite::Message::Close(None)).await;
                sink.mark_closed();
                debug!("WebSocket released by owner");
                return;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        sink.message(text.to_string());
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        let (code, reason) = frame.map_or_else(
                            || (1005, String::new()),
                            |cf| (u16::from(cf.code), cf.reason.to_string()),
                        );
                        info!(code, reason = %reason, "WebSocket close frame received");
                        sink.closed(code, reason);
                        return;
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        trace!("WebSocket ping");
                    }
                    Some(Ok(_)) => {
                        // Binary, Pong, Frame -- ignore
                    }
                    Some(Err(e)) => {
                        sink.error(e.to_string());
                        sink.closed(ABNORMAL_CLOSURE, e.to_string());
                        return;
                    }
                    None => {
                        info!("WebSocket stream ended");
                        sink.closed(ABNORMAL_CLOSURE, "stream ended");
                        return;
                    }
                }
            }
        }
    }
}
